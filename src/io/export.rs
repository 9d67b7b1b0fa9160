//! Export the enriched dataset to CSV.
//!
//! Column names come from the schema, so the export reads the same as the
//! canonical field names used everywhere else.

use std::path::Path;

use tracing::info;

use crate::domain::{Dataset, Observation};
use crate::error::AppError;
use crate::schema::{Field, Schema};

/// Write every row, sorted by entity, kind, and date.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset, schema: &Schema) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(header(schema))
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let mut rows: Vec<&Observation> = dataset.rows().iter().collect();
    rows.sort_by(|a, b| (&a.entity, a.kind, a.date).cmp(&(&b.entity, b.kind, b.date)));

    for row in rows {
        writer
            .write_record(record(row, schema))
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;

    info!(path = %path.display(), rows = dataset.len(), "wrote dataset CSV");
    Ok(())
}

fn header(schema: &Schema) -> Vec<String> {
    let mut cols: Vec<String> = schema
        .base_key()
        .into_iter()
        .map(|f| schema.column(f).to_string())
        .collect();
    cols.extend(schema.metrics().iter().map(|&m| schema.metric_column(m).to_string()));
    cols.push(schema.column(Field::Population).to_string());
    cols.extend(schema.metrics().iter().map(|&m| schema.per_million_column(m)));
    cols
}

fn record(row: &Observation, schema: &Schema) -> Vec<String> {
    let mut out: Vec<String> = schema
        .base_key()
        .into_iter()
        .map(|f| match f {
            Field::Region => row
                .entity
                .region
                .map(|r| r.display_name().to_string())
                .unwrap_or_default(),
            Field::Country => row.entity.country.clone(),
            Field::SeriesKind => row.kind.label(),
            Field::Date => row.date.to_string(),
            Field::Population | Field::Metric(_) => String::new(),
        })
        .collect();
    out.extend(schema.metrics().iter().map(|&m| fmt_opt(row.metrics.get(m))));
    out.push(fmt_opt(row.population_millions));
    out.extend(schema.metrics().iter().map(|&m| fmt_opt(row.per_million.get(m))));
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityPath, MetricValues, SeriesKind};
    use crate::schema::{Metric, Region};
    use chrono::NaiveDate;

    #[test]
    fn writes_schema_named_columns() {
        let mut row = Observation::new(
            EntityPath::new(Some(Region::SouthEastAsia), "Thailand"),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            SeriesKind::MovingAverage { days: 7 },
            MetricValues::default().with(Metric::NewCases, 12.5),
        );
        row.population_millions = Some(70.0);
        row.per_million.set(Metric::NewCases, Some(0.25));
        let ds = Dataset::from_rows(vec![row]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_dataset_csv(&path, &ds, &Schema::who()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Region,Country,Frequency,Date Reported,New Cases,New Deaths,Cumulative Cases,\
Cumulative Deaths,Population (Million),New Cases per Million Population,\
New Deaths per Million Population,Cumulative Cases per Million Population,\
Cumulative Deaths per Million Population"
        );
        assert_eq!(
            lines.next().unwrap(),
            "South-East Asia,Thailand,7-day Moving Average,2024-01-08,12.5,,,,70,0.25,,,"
        );
    }
}
