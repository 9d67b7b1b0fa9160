//! Schema registry: canonical column names and the raw-source mapping.
//!
//! Every other module refers to fields through a [`Schema`] value that is built
//! once and passed down explicitly. Renaming a source column is a one-line edit
//! to [`Schema::who`].

use serde::{Deserialize, Serialize};

pub mod region;

pub use region::*;

/// Numeric metric columns carried by every observation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NewCases,
    NewDeaths,
    CumulativeCases,
    CumulativeDeaths,
}

impl Metric {
    pub const COUNT: usize = 4;

    /// Column order used for exports and summaries.
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::NewCases,
        Metric::NewDeaths,
        Metric::CumulativeCases,
        Metric::CumulativeDeaths,
    ];

    /// Slot of this metric inside a [`crate::domain::MetricValues`].
    pub fn index(self) -> usize {
        match self {
            Metric::NewCases => 0,
            Metric::NewDeaths => 1,
            Metric::CumulativeCases => 2,
            Metric::CumulativeDeaths => 3,
        }
    }

    /// Stable snake_case key (used in configuration).
    pub fn key(self) -> &'static str {
        match self {
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::CumulativeCases => "cumulative_cases",
            Metric::CumulativeDeaths => "cumulative_deaths",
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        let key = key.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(key))
    }
}

/// A semantic field of an observation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Region,
    Country,
    SeriesKind,
    Date,
    Population,
    Metric(Metric),
}

/// One entry of the raw-to-canonical rename table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Column name as published by the source.
    pub source: String,
    pub field: Field,
}

impl RawColumn {
    pub fn new(source: impl Into<String>, field: Field) -> Self {
        Self {
            source: source.into(),
            field,
        }
    }
}

/// Immutable column registry.
#[derive(Debug, Clone)]
pub struct Schema {
    region: String,
    country: String,
    series_kind: String,
    date: String,
    population: String,
    metrics: [String; Metric::COUNT],
    raw: Vec<RawColumn>,
}

impl Schema {
    /// Canonical names plus the WHO global CSV mapping.
    pub fn who() -> Self {
        Self::with_raw_mapping(vec![
            RawColumn::new("WHO_region", Field::Region),
            RawColumn::new("Country", Field::Country),
            RawColumn::new("Date_reported", Field::Date),
            RawColumn::new("New_cases", Field::Metric(Metric::NewCases)),
            RawColumn::new("New_deaths", Field::Metric(Metric::NewDeaths)),
            RawColumn::new("Cumulative_cases", Field::Metric(Metric::CumulativeCases)),
            RawColumn::new("Cumulative_deaths", Field::Metric(Metric::CumulativeDeaths)),
        ])
    }

    /// Canonical names with a custom source mapping.
    ///
    /// Leaving `Field::Region` out of the mapping yields a one-level hierarchy
    /// (countries directly under the root).
    pub fn with_raw_mapping(raw: Vec<RawColumn>) -> Self {
        Self {
            region: "Region".to_string(),
            country: "Country".to_string(),
            series_kind: "Frequency".to_string(),
            date: "Date Reported".to_string(),
            population: "Population (Million)".to_string(),
            metrics: [
                "New Cases".to_string(),
                "New Deaths".to_string(),
                "Cumulative Cases".to_string(),
                "Cumulative Deaths".to_string(),
            ],
            raw,
        }
    }

    /// Canonical column name for a field.
    pub fn column(&self, field: Field) -> &str {
        match field {
            Field::Region => &self.region,
            Field::Country => &self.country,
            Field::SeriesKind => &self.series_kind,
            Field::Date => &self.date,
            Field::Population => &self.population,
            Field::Metric(m) => &self.metrics[m.index()],
        }
    }

    pub fn metric_column(&self, metric: Metric) -> &str {
        self.column(Field::Metric(metric))
    }

    /// Name of the derived per-capita column for a metric.
    pub fn per_million_column(&self, metric: Metric) -> String {
        format!("{} per Million Population", self.metric_column(metric))
    }

    /// Fields that identify a row, in key order.
    pub fn base_key(&self) -> Vec<Field> {
        let mut key = Vec::with_capacity(4);
        if self.has_region() {
            key.push(Field::Region);
        }
        key.extend([Field::Country, Field::SeriesKind, Field::Date]);
        key
    }

    /// Ordered raw-to-canonical mapping.
    pub fn raw_mapping(&self) -> &[RawColumn] {
        &self.raw
    }

    /// Raw source name mapped to a field, if the source provides it.
    pub fn raw_name(&self, field: Field) -> Option<&str> {
        self.raw
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.source.as_str())
    }

    pub fn has_region(&self) -> bool {
        self.raw_name(Field::Region).is_some()
    }

    /// Numeric metric columns, in export order.
    pub fn metrics(&self) -> &'static [Metric] {
        &Metric::ALL
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::who()
    }
}
