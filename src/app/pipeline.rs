//! The shared pipeline behind every output.
//!
//! Two branches run off one ingested dataset:
//! - selected countries -> moving average -> union -> population -> time-series chart
//! - all countries -> latest observation -> rollup
//!
//! Rendering and printing are left to the caller.

use chrono::{Months, NaiveDate};
use tracing::{info, warn};

use crate::data::{PopulationLookup, RestCountriesClient, WhoClient, collect_populations, read_csv_file};
use crate::domain::{Dataset, Observation, RunConfig, SeriesKind};
use crate::error::{AppError, Skipped};
use crate::io::ingest::{IngestedData, read_dataset};
use crate::plot::{TimeSeriesChart, prepare_time_series};
use crate::schema::Schema;
use crate::transform::{Rollup, build_rollup, latest_observations, moving_average, normalize_population};

/// All computed outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    /// Selected countries, `Actual` and smoothed rows, with per-capita columns.
    pub enriched: Dataset,
    pub chart: TimeSeriesChart,
    pub latest: Vec<Observation>,
    pub rollup: Rollup,
    /// Latest date among `latest`.
    pub snapshot_date: Option<NaiveDate>,
    pub skipped: Vec<Skipped>,
}

/// Fetch (or read) the case data, look up populations over HTTP, and run.
pub fn run(config: &RunConfig, schema: &Schema) -> Result<RunOutput, AppError> {
    let csv_text = match &config.data_file {
        Some(path) => read_csv_file(path)?,
        None => WhoClient::new(config.data_url.as_str(), config.fetch_timeout)?.fetch_csv()?,
    };
    let populations = RestCountriesClient::new(config.population_url.as_str(), config.population_timeout)?;
    let today = chrono::Local::now().date_naive();

    run_with_source(config, schema, &csv_text, &populations, today)
}

/// Run the pipeline on CSV text already in memory.
///
/// `today` anchors the trailing chart window.
pub fn run_with_source(
    config: &RunConfig,
    schema: &Schema,
    csv_text: &str,
    populations: &dyn PopulationLookup,
    today: NaiveDate,
) -> Result<RunOutput, AppError> {
    let mut skipped = Vec::new();

    // 1) Ingest.
    let ingest = read_dataset(csv_text.as_bytes(), schema)?;

    // 2) Branch A: selected countries only.
    let mut selected = ingest.dataset.clone();
    selected.retain_countries(&config.countries);
    if selected.is_empty() {
        skipped.push(empty(Skipped::EmptyResult { stage: "country selection" }));
    }

    let smoothed = moving_average(&selected, schema, config.ma_days)?;
    skipped.extend(smoothed.skipped);
    let kind = smoothed.kind;
    let mut enriched = selected.union(smoothed.rows)?;

    let table = collect_populations(populations, &enriched.countries())?;
    skipped.extend(normalize_population(&mut enriched, &table));

    let date_from = today
        .checked_sub_months(Months::new(config.plot_months))
        .unwrap_or(NaiveDate::MIN);
    let chart = prepare_time_series(&enriched, schema, kind, config.plot_metric, &config.countries, date_from);
    if chart.is_empty() {
        skipped.push(empty(Skipped::EmptyResult { stage: "time-series chart" }));
    }

    // 3) Branch B: every country's latest valid observation.
    let latest = latest_observations(ingest.dataset.rows());
    if latest.is_empty() {
        skipped.push(empty(Skipped::EmptyResult { stage: "latest observations" }));
    }
    let snapshot_date = latest.iter().map(|r| r.date).max();
    let rollup = build_rollup(&latest, &config.root_label);

    info!(
        enriched = enriched.len(),
        smoothed = enriched.of_kind(kind).count(),
        actual = enriched.of_kind(SeriesKind::Actual).count(),
        latest = latest.len(),
        skipped = skipped.len(),
        "pipeline complete"
    );

    Ok(RunOutput {
        ingest,
        enriched,
        chart,
        latest,
        rollup,
        snapshot_date,
        skipped,
    })
}

fn empty(s: Skipped) -> Skipped {
    warn!("{s}");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Metric;
    use std::collections::HashMap;
    use std::fmt::Write as _;

    /// Ten days for Malaysia (Western Pacific), two for Kenya (Africa).
    fn csv_fixture() -> String {
        let mut csv = String::from(
            "Date_reported,Country_code,Country,WHO_region,New_cases,Cumulative_cases,New_deaths,Cumulative_deaths\n",
        );
        let mut total = 0;
        for d in 1..=10 {
            total += d * 10;
            writeln!(csv, "2024-03-{d:02},MY,Malaysia,WPRO,{},{total},1,{d}", d * 10).unwrap();
        }
        writeln!(csv, "2024-03-09,KE,Kenya,AFRO,4,4,0,0").unwrap();
        writeln!(csv, "2024-03-10,KE,Kenya,AFRO,6,10,0,0").unwrap();
        csv
    }

    fn config(countries: &[&str]) -> RunConfig {
        RunConfig {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            ..RunConfig::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn end_to_end_with_static_population() {
        let populations: HashMap<String, u64> = HashMap::from([("Malaysia".to_string(), 2_000_000)]);
        let out = run_with_source(
            &config(&["Malaysia"]),
            &Schema::who(),
            &csv_fixture(),
            &populations,
            today(),
        )
        .unwrap();

        assert_eq!(out.ingest.rows_used, 12);
        assert!(out.skipped.is_empty(), "{:?}", out.skipped);

        // Branch A: 10 actual rows + 4 smoothed rows, Malaysia only.
        let ma = SeriesKind::MovingAverage { days: 7 };
        assert_eq!(out.enriched.of_kind(SeriesKind::Actual).count(), 10);
        assert_eq!(out.enriched.of_kind(ma).count(), 4);
        assert_eq!(out.enriched.countries(), vec!["Malaysia".to_string()]);

        let first_ma = out
            .enriched
            .of_kind(ma)
            .min_by_key(|r| r.date)
            .unwrap();
        assert_eq!(first_ma.date, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(first_ma.metrics.get(Metric::NewCases), Some(40.0));
        assert_eq!(first_ma.per_million.get(Metric::NewCases), Some(20.0));

        assert_eq!(out.chart.lines.len(), 1);
        assert_eq!(out.chart.lines[0].points().count(), 4);

        // Branch B: every country, regardless of selection.
        assert_eq!(out.latest.len(), 2);
        assert_eq!(out.snapshot_date, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert_eq!(out.rollup.root().values.get(Metric::NewCases), Some(106.0));
        assert_eq!(
            out.rollup
                .node("World/Western Pacific")
                .and_then(|n| n.values.get(Metric::NewCases)),
            Some(100.0)
        );
    }

    #[test]
    fn population_miss_is_reported_not_fatal() {
        let populations: HashMap<String, u64> = HashMap::new();
        let out = run_with_source(
            &config(&["Malaysia"]),
            &Schema::who(),
            &csv_fixture(),
            &populations,
            today(),
        )
        .unwrap();

        assert!(out.skipped.contains(&Skipped::LookupMiss {
            country: "Malaysia".to_string()
        }));
        assert!(out.enriched.rows().iter().all(|r| r.per_million.is_all_none()));
        assert!(out.skipped.contains(&Skipped::EmptyResult { stage: "time-series chart" }));
    }

    #[test]
    fn short_series_and_old_data_are_diagnostics() {
        let populations: HashMap<String, u64> = HashMap::from([("Kenya".to_string(), 50_000_000)]);
        let out = run_with_source(
            &config(&["Kenya"]),
            &Schema::who(),
            &csv_fixture(),
            &populations,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
        .unwrap();

        assert!(out.skipped.iter().any(|s| matches!(s, Skipped::InsufficientWindow { .. })));
        assert!(out.chart.is_empty());
    }

    #[test]
    fn unknown_selection_still_builds_rollup() {
        let populations: HashMap<String, u64> = HashMap::new();
        let out = run_with_source(
            &config(&["Atlantis"]),
            &Schema::who(),
            &csv_fixture(),
            &populations,
            today(),
        )
        .unwrap();

        assert!(out.skipped.contains(&Skipped::EmptyResult { stage: "country selection" }));
        assert_eq!(out.latest.len(), 2);
    }

    #[test]
    fn schema_violation_aborts_with_exit_code_3() {
        let csv = "Date_reported,Country,WHO_region,New_cases,Cumulative_cases,New_deaths\n";
        let err = run_with_source(
            &config(&["Malaysia"]),
            &Schema::who(),
            csv,
            &HashMap::<String, u64>::new(),
            today(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
