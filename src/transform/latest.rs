//! Latest valid observation per country.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Observation, SeriesKind};
use crate::schema::Metric;

/// For each country, the `Actual` row with the latest date, kept only when its
/// new-case count is strictly positive.
///
/// Rows sharing the latest date are resolved by a stable ascending sort on
/// date: the last one encountered wins. Output is sorted by country.
pub fn latest_observations<'a>(rows: impl IntoIterator<Item = &'a Observation>) -> Vec<Observation> {
    let mut by_country: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for row in rows.into_iter().filter(|r| r.kind == SeriesKind::Actual) {
        by_country.entry(row.country()).or_default().push(row);
    }

    let mut out = Vec::with_capacity(by_country.len());
    for (country, mut series) in by_country {
        series.sort_by_key(|r| r.date);
        let Some(latest) = series.last() else { continue };

        match latest.metrics.get(Metric::NewCases) {
            Some(v) if v > 0.0 => out.push((*latest).clone()),
            other => debug!(country, date = %latest.date, new_cases = ?other, "stale latest row; excluded"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityPath, MetricValues};
    use crate::schema::Region;
    use chrono::NaiveDate;

    fn row(country: &str, d: u32, new_cases: Option<f64>, kind: SeriesKind) -> Observation {
        let mut metrics = MetricValues::default();
        metrics.set(Metric::NewCases, new_cases);
        Observation::new(
            EntityPath::new(Some(Region::Americas), country),
            NaiveDate::from_ymd_opt(2024, 2, d).unwrap(),
            kind,
            metrics,
        )
    }

    #[test]
    fn picks_latest_positive_row_per_country() {
        let rows = vec![
            row("Chile", 3, Some(4.0), SeriesKind::Actual),
            row("Chile", 1, Some(9.0), SeriesKind::Actual),
            row("Peru", 2, Some(1.0), SeriesKind::Actual),
        ];
        let latest = latest_observations(&rows);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].country(), "Chile");
        assert_eq!(latest[0].date.to_string(), "2024-02-03");
        assert_eq!(latest[1].country(), "Peru");
    }

    #[test]
    fn stale_countries_are_excluded() {
        let rows = vec![
            row("Chile", 1, Some(5.0), SeriesKind::Actual),
            row("Chile", 2, Some(0.0), SeriesKind::Actual),
            row("Peru", 1, Some(5.0), SeriesKind::Actual),
            row("Peru", 2, Some(-3.0), SeriesKind::Actual),
            row("Cuba", 2, None, SeriesKind::Actual),
        ];
        // An older positive row never stands in for a stale latest one.
        assert!(latest_observations(&rows).is_empty());
    }

    #[test]
    fn smoothed_rows_are_ignored() {
        let rows = vec![
            row("Chile", 1, Some(5.0), SeriesKind::Actual),
            row("Chile", 9, Some(7.0), SeriesKind::MovingAverage { days: 7 }),
        ];
        let latest = latest_observations(&rows);
        assert_eq!(latest[0].date.to_string(), "2024-02-01");
    }

    #[test]
    fn ties_prefer_last_encountered() {
        let rows = vec![
            row("Chile", 4, Some(1.0), SeriesKind::Actual),
            row("Chile", 4, Some(2.0), SeriesKind::Actual),
        ];
        let latest = latest_observations(&rows);
        assert_eq!(latest[0].metrics.get(Metric::NewCases), Some(2.0));
    }
}
