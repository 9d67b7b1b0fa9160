//! Per-capita normalization.
//!
//! Left-joins a country → headcount table into the dataset (scaled to
//! millions) and fills the `"<metric> per Million Population"` values.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::domain::{Dataset, MetricValues};
use crate::error::Skipped;

/// Join populations into every row and derive per-million metrics.
///
/// Rows of countries missing from `populations` are kept with empty population
/// and per-capita values; one [`Skipped::LookupMiss`] is returned per such
/// country.
pub fn normalize_population(
    dataset: &mut Dataset,
    populations: &HashMap<String, u64>,
) -> Vec<Skipped> {
    let mut missing = BTreeSet::new();

    for row in dataset.rows_mut() {
        let population = populations.get(row.country()).map(|&p| p as f64 / 1e6);
        if population.is_none() {
            missing.insert(row.entity.country.clone());
        }

        row.population_millions = population;
        row.per_million = MetricValues::from_fn(|m| per_million(row.metrics.get(m), population));
    }

    missing
        .into_iter()
        .map(|country| {
            warn!(%country, "population unknown; per-capita values left empty");
            Skipped::LookupMiss { country }
        })
        .collect()
}

/// `value / population_millions`, or `None` when either side is missing or the
/// population is not a positive finite number.
pub fn per_million(value: Option<f64>, population_millions: Option<f64>) -> Option<f64> {
    let population = population_millions.filter(|p| p.is_finite() && *p > 0.0)?;
    Some(value? / population)
}
