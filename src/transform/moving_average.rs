//! Per-entity trailing moving averages with jagged-edge trimming.
//!
//! For each entity the `Actual` rows are sorted by date and every metric is
//! averaged over the trailing `w` calendar days. A window is defined only when
//! all `w` days are present and carry a value; a missing day is absent, never
//! zero.
//!
//! Trimming keeps a row when it lies inside the defined span (first to last
//! defined mean) of at least one metric. Leading and trailing partial-window
//! rows therefore disappear, while interior nulls caused by source gaps stay
//! in place as empty cells.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{Dataset, EntityPath, MetricValues, Observation, SeriesKind};
use crate::error::{PipelineError, Skipped};
use crate::schema::{Metric, Schema};

/// Smoothed rows plus the entities that produced none.
#[derive(Debug, Clone)]
pub struct MovingAverageOutput {
    pub kind: SeriesKind,
    pub rows: Vec<Observation>,
    pub skipped: Vec<Skipped>,
}

/// Compute `window`-day moving-average rows for every entity's `Actual` series.
pub fn moving_average(
    dataset: &Dataset,
    schema: &Schema,
    window: usize,
) -> Result<MovingAverageOutput, PipelineError> {
    if window == 0 {
        return Err(PipelineError::InvalidWindow(window));
    }
    let kind = SeriesKind::MovingAverage { days: window };

    let mut groups: BTreeMap<&EntityPath, Vec<&Observation>> = BTreeMap::new();
    for row in dataset.of_kind(SeriesKind::Actual) {
        groups.entry(&row.entity).or_default().push(row);
    }

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (entity, mut series) in groups {
        series.sort_by_key(|r| r.date);

        let smoothed = smooth_series(&series, schema.metrics(), window);
        if smoothed.is_empty() {
            let with_values = series.iter().filter(|r| !r.metrics.is_all_none()).count();
            warn!(%entity, observations = series.len(), with_values, window, "no defined window; skipping");
            skipped.push(Skipped::InsufficientWindow {
                entity: entity.to_string(),
                observations: series.len(),
                with_values,
                window,
            });
            continue;
        }

        debug!(%entity, rows = smoothed.len(), window, "smoothed series");
        rows.extend(
            smoothed
                .into_iter()
                .map(|(date, metrics)| Observation::new(entity.clone(), date, kind, metrics)),
        );
    }

    Ok(MovingAverageOutput {
        kind,
        rows,
        skipped,
    })
}

/// Smooth one date-sorted series and trim it to its valid span.
fn smooth_series(
    series: &[&Observation],
    metrics: &[Metric],
    window: usize,
) -> Vec<(chrono::NaiveDate, MetricValues)> {
    if series.len() < window {
        return Vec::new();
    }

    let means: Vec<MetricValues> = (0..series.len())
        .map(|i| MetricValues::from_fn(|m| trailing_mean(series, i, m, window)))
        .collect();

    let spans: Vec<(usize, usize)> = metrics
        .iter()
        .filter_map(|&m| defined_span(means.iter().map(|v| v.get(m))))
        .collect();

    series
        .iter()
        .zip(means)
        .enumerate()
        .filter(|(i, _)| spans.iter().any(|&(first, last)| first <= *i && *i <= last))
        .map(|(_, (row, values))| (row.date, values))
        .collect()
}

/// Mean of `metric` over the `window` rows ending at `end`.
///
/// `None` unless those rows cover exactly `window` consecutive days and every
/// one of them has a value.
fn trailing_mean(series: &[&Observation], end: usize, metric: Metric, window: usize) -> Option<f64> {
    let start = (end + 1).checked_sub(window)?;
    let span_days = (series[end].date - series[start].date).num_days();
    if span_days != window as i64 - 1 {
        return None;
    }

    let mut sum = 0.0;
    for row in &series[start..=end] {
        sum += row.metrics.get(metric)?;
    }
    Some(sum / window as f64)
}

/// First and last index at which a value is defined.
fn defined_span(values: impl Iterator<Item = Option<f64>>) -> Option<(usize, usize)> {
    let mut span = None;
    for (i, v) in values.enumerate() {
        if v.is_some() {
            span = match span {
                None => Some((i, i)),
                Some((first, _)) => Some((first, i)),
            };
        }
    }
    span
}
