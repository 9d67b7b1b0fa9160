//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - unioned into one [`Dataset`] regardless of series kind
//! - exported to CSV/JSON
//! - handed to the chart renderers without reshaping

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::schema::{Metric, Region};

/// Whether a row is raw source data or a smoothed derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeriesKind {
    Actual,
    MovingAverage { days: usize },
}

impl SeriesKind {
    /// Human-readable label, e.g. `7-day Moving Average`.
    pub fn label(self) -> String {
        match self {
            SeriesKind::Actual => "Actual".to_string(),
            SeriesKind::MovingAverage { days } => format!("{days}-day Moving Average"),
        }
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Position of a country in the world → region → country tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityPath {
    pub region: Option<Region>,
    pub country: String,
}

impl EntityPath {
    pub fn new(region: Option<Region>, country: impl Into<String>) -> Self {
        Self {
            region,
            country: country.into(),
        }
    }
}

impl std::fmt::Display for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.region {
            Some(region) => write!(f, "{region}/{}", self.country),
            None => f.write_str(&self.country),
        }
    }
}

/// One optional value per [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricValues([Option<f64>; Metric::COUNT]);

impl MetricValues {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.0[metric.index()] = value;
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn from_fn(mut f: impl FnMut(Metric) -> Option<f64>) -> Self {
        let mut out = Self::default();
        for m in Metric::ALL {
            out.set(m, f(m));
        }
        out
    }

    pub fn is_all_none(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// The atomic row of the pipeline.
///
/// Actual and smoothed rows share this shape so both kinds can live in one
/// [`Dataset`]. `population_millions` and `per_million` stay empty until the
/// population normalizer has run.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity: EntityPath,
    pub date: NaiveDate,
    pub kind: SeriesKind,
    pub metrics: MetricValues,
    pub population_millions: Option<f64>,
    pub per_million: MetricValues,
}

impl Observation {
    pub fn new(entity: EntityPath, date: NaiveDate, kind: SeriesKind, metrics: MetricValues) -> Self {
        Self {
            entity,
            date,
            kind,
            metrics,
            population_millions: None,
            per_million: MetricValues::default(),
        }
    }

    pub fn country(&self) -> &str {
        &self.entity.country
    }
}

/// A collection of observations with unique `(entity, kind, date)` keys.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Observation>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate keys.
    pub fn from_rows(rows: Vec<Observation>) -> Result<Self, PipelineError> {
        ensure_unique_keys(&rows)?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Mutable access for enrichment stages.
    ///
    /// Stages may append values but must not touch the key fields.
    pub fn rows_mut(&mut self) -> &mut [Observation] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append rows (e.g. a smoothed series) and re-check uniqueness.
    pub fn union(self, extra: Vec<Observation>) -> Result<Self, PipelineError> {
        let mut rows = self.rows;
        rows.extend(extra);
        Self::from_rows(rows)
    }

    pub fn of_kind(&self, kind: SeriesKind) -> impl Iterator<Item = &Observation> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }

    /// Distinct country names, sorted.
    pub fn countries(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.country()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Keep only the rows of the listed countries.
    pub fn retain_countries(&mut self, countries: &[String]) {
        let wanted: HashSet<&str> = countries.iter().map(|c| c.trim()).collect();
        self.rows.retain(|r| wanted.contains(r.country()));
    }
}

fn ensure_unique_keys(rows: &[Observation]) -> Result<(), PipelineError> {
    let mut seen = HashSet::with_capacity(rows.len());
    for r in rows {
        if !seen.insert((&r.entity, r.kind, r.date)) {
            return Err(PipelineError::DuplicateKey {
                entity: r.entity.to_string(),
                kind: r.kind.label(),
                date: r.date,
            });
        }
    }
    Ok(())
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from environment variables (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// CSV endpoint for the raw case data.
    pub data_url: String,
    /// Local CSV used instead of fetching `data_url`.
    pub data_file: Option<PathBuf>,
    /// Countries shown in the time-series branch.
    pub countries: Vec<String>,
    /// Moving-average window in days.
    pub ma_days: usize,
    /// Trailing months shown on the time-series chart.
    pub plot_months: u32,
    /// Metric plotted (per million population) on the time-series chart.
    pub plot_metric: Metric,
    /// Metric broken down on the nested-proportion chart.
    pub sunburst_metric: Metric,
    /// Label of the rollup root.
    pub root_label: String,

    pub export: bool,
    pub output_dir: PathBuf,

    pub fetch_timeout: Duration,
    pub population_url: String,
    pub population_timeout: Duration,

    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_url: "https://covid19.who.int/WHO-COVID-19-global-data.csv".to_string(),
            data_file: None,
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            ma_days: 7,
            plot_months: 12,
            plot_metric: Metric::NewCases,
            sunburst_metric: Metric::NewCases,
            root_label: "World".to_string(),
            export: false,
            output_dir: PathBuf::from("output"),
            fetch_timeout: Duration::from_secs(60),
            population_url: "https://restcountries.com/v3.1/name/".to_string(),
            population_timeout: Duration::from_secs(10),
            plot_width: 100,
            plot_height: 25,
        }
    }
}

pub const DEFAULT_COUNTRIES: [&str; 6] = [
    "Indonesia",
    "Malaysia",
    "Philippines",
    "Singapore",
    "Thailand",
    "Viet Nam",
];
