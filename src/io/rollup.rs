//! Read/write rollup JSON files.
//!
//! The JSON carries the `(ids, labels, parents, values)` columns of one metric
//! plus the snapshot date, so any nested-proportion renderer can consume it.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::schema::{Metric, Schema};
use crate::transform::RollupTriple;

/// On-disk rollup representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupFile {
    pub tool: String,
    pub snapshot_date: Option<NaiveDate>,
    pub metric: Metric,
    pub metric_label: String,
    pub branch_values: String,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<f64>,
}

impl RollupFile {
    pub fn new(triple: &RollupTriple, snapshot_date: Option<NaiveDate>, schema: &Schema) -> Self {
        Self {
            tool: "covid-trends".to_string(),
            snapshot_date,
            metric: triple.metric,
            metric_label: schema.metric_column(triple.metric).to_string(),
            branch_values: "total".to_string(),
            ids: triple.ids.clone(),
            labels: triple.labels.clone(),
            parents: triple.parents.clone(),
            values: triple.values.clone(),
        }
    }
}

/// Write a rollup JSON file.
pub fn write_rollup_json(path: &Path, rollup: &RollupFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create rollup JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, rollup)
        .map_err(|e| AppError::new(2, format!("Failed to write rollup JSON: {e}")))?;

    info!(path = %path.display(), nodes = rollup.ids.len(), "wrote rollup JSON");
    Ok(())
}

/// Read a rollup JSON file.
pub fn read_rollup_json(path: &Path) -> Result<RollupFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open rollup JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid rollup JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityPath, MetricValues, Observation, SeriesKind};
    use crate::schema::Region;
    use crate::transform::build_rollup;

    #[test]
    fn rollup_json_keeps_total_semantics() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let leaves = vec![Observation::new(
            EntityPath::new(Some(Region::Africa), "Kenya"),
            date,
            SeriesKind::Actual,
            MetricValues::default().with(Metric::NewCases, 8.0),
        )];
        let triple = build_rollup(&leaves, "World").triple(Metric::NewCases);
        let file = RollupFile::new(&triple, Some(date), &Schema::who());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollup.json");
        write_rollup_json(&path, &file).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["branch_values"], "total");
        assert_eq!(raw["metric"], "new_cases");
        assert_eq!(raw["metric_label"], "New Cases");
        assert_eq!(raw["values"], serde_json::json!([8.0, 8.0, 8.0]));

        assert_eq!(read_rollup_json(&path).unwrap(), file);
    }
}
