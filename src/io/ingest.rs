//! CSV ingest and normalization.
//!
//! This module turns the raw case-data CSV into a [`Dataset`] of `Actual`
//! observations keyed by canonical fields.
//!
//! Design goals:
//! - **Strict schema**: every mapped column must be present in the header
//! - **Whole-load abort**: a row that is too short for a mapped column, lacks a
//!   required value, carries an unmapped region code, or holds an unparsable
//!   number fails the load with the offending line number
//! - **Absent, not zero**: empty metric cells become `None`
//! - **Separation of concerns**: no smoothing or joining here

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{Dataset, EntityPath, MetricValues, Observation, SeriesKind};
use crate::error::{AppError, PipelineError};
use crate::schema::{Field, Metric, Region, Schema};

/// Summary stats about the rows that were kept.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub n_countries: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Ingest output: the dataset plus counters for the run summary.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub stats: Option<DatasetStats>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Read a CSV into a dataset of `Actual` rows.
pub fn read_dataset<R: Read>(reader: R, schema: &Schema) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(3, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let columns = resolve_columns(&headers, schema)?;

    let mut rows = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        rows_read += 1;

        let record = result.map_err(|e| AppError::new(3, format!("CSV parse error: {e}")))?;
        // Quoted fields may span lines, so take the record's own start line.
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);

        rows.push(parse_row(&record, &columns, schema, line)?);
    }

    let dataset = Dataset::from_rows(rows)?;
    let stats = compute_stats(&dataset);
    let rows_used = dataset.len();

    match &stats {
        Some(s) => info!(
            rows = rows_used,
            countries = s.n_countries,
            first = %s.first_date,
            last = %s.last_date,
            "ingested case data"
        ),
        None => info!(rows_read, "ingested case data: no rows"),
    }

    Ok(IngestedData {
        dataset,
        stats,
        rows_read,
        rows_used,
    })
}

/// Header positions of every mapped field.
#[derive(Debug)]
struct ColumnIndex {
    region: Option<usize>,
    country: usize,
    date: usize,
    metrics: Vec<(Metric, usize)>,
}

fn resolve_columns(headers: &StringRecord, schema: &Schema) -> Result<ColumnIndex, PipelineError> {
    let header_map = build_header_map(headers);

    let mut positions: HashMap<Field, usize> = HashMap::new();
    for col in schema.raw_mapping() {
        let idx = header_map
            .get(&normalize_header_name(&col.source))
            .ok_or_else(|| PipelineError::MissingColumn {
                column: schema.column(col.field).to_string(),
                raw: col.source.clone(),
            })?;
        positions.insert(col.field, *idx);
    }

    let required = |field: Field| -> Result<usize, PipelineError> {
        positions
            .get(&field)
            .copied()
            .ok_or_else(|| PipelineError::MissingColumn {
                column: schema.column(field).to_string(),
                raw: String::new(),
            })
    };

    let country = required(Field::Country)?;
    let date = required(Field::Date)?;
    let region = positions.get(&Field::Region).copied();

    let metrics = schema
        .metrics()
        .iter()
        .filter_map(|&m| positions.get(&Field::Metric(m)).map(|&idx| (m, idx)))
        .collect();

    debug!(?region, country, date, "resolved CSV header");

    Ok(ColumnIndex {
        region,
        country,
        date,
        metrics,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnIndex,
    schema: &Schema,
    line: usize,
) -> Result<Observation, PipelineError> {
    let region = match columns.region {
        Some(idx) => {
            let code = get_required(record, idx, schema, Field::Region, line)?;
            let region = Region::from_code(code).ok_or_else(|| PipelineError::UnknownRegion {
                line,
                code: code.to_string(),
            })?;
            Some(region)
        }
        None => None,
    };

    let country = get_required(record, columns.country, schema, Field::Country, line)?;
    let raw_date = get_required(record, columns.date, schema, Field::Date, line)?;
    let date = parse_date(raw_date).ok_or_else(|| PipelineError::InvalidValue {
        line,
        column: schema.column(Field::Date).to_string(),
        value: raw_date.to_string(),
    })?;

    let mut metrics = MetricValues::default();
    for &(metric, idx) in &columns.metrics {
        let value = match get_cell(record, idx, || schema.metric_column(metric).to_string(), line)? {
            Some(raw) => Some(parse_metric(raw).ok_or_else(|| PipelineError::InvalidValue {
                line,
                column: schema.metric_column(metric).to_string(),
                value: raw.to_string(),
            })?),
            None => None,
        };
        metrics.set(metric, value);
    }

    Ok(Observation::new(
        EntityPath::new(region, country),
        date,
        SeriesKind::Actual,
        metrics,
    ))
}

fn compute_stats(dataset: &Dataset) -> Option<DatasetStats> {
    let (first_date, last_date) = dataset.date_range()?;
    Some(DatasetStats {
        n_rows: dataset.len(),
        n_countries: dataset.countries().len(),
        first_date,
        last_date,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    idx: usize,
    schema: &Schema,
    field: Field,
    line: usize,
) -> Result<&'a str, PipelineError> {
    let column = || schema.column(field).to_string();
    get_cell(record, idx, column, line)?.ok_or_else(|| PipelineError::MissingValue {
        line,
        column: column(),
    })
}

/// A mapped cell: `None` when empty, an error when the record is too short
/// to have it at all.
fn get_cell<'a>(
    record: &'a StringRecord,
    idx: usize,
    column: impl Fn() -> String,
    line: usize,
) -> Result<Option<&'a str>, PipelineError> {
    let cell = record
        .get(idx)
        .ok_or_else(|| PipelineError::MissingValue { line, column: column() })?;
    let cell = cell.trim();
    Ok(if cell.is_empty() { None } else { Some(cell) })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // The feed publishes ISO dates; a few mirrors re-export with day-first or
    // slashed formats, or with a time component attached.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    let s = s.split(['T', ' ']).next().unwrap_or(s);
    FMTS.iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_metric(s: &str) -> Option<f64> {
    let v = s.replace(',', "").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
