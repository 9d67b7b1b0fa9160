//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads configuration from the environment (and `.env`)
//! - runs the shared pipeline
//! - prints reports and the terminal plot
//! - writes optional exports

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::domain::RunConfig;
use crate::error::AppError;
use crate::io::{RollupFile, write_dataset_csv, write_rollup_json};
use crate::plot::{render_time_series_ascii, write_sunburst_svg, write_time_series_svg};
use crate::schema::{Metric, Schema};

pub mod pipeline;

/// Entry point for the `covid-trends` binary.
pub fn run() -> Result<(), AppError> {
    crate::logging::init_logging();

    let config = config_from_env()?;
    let schema = Schema::who();
    let run = pipeline::run(&config, &schema)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.enriched, &run.skipped, &config, &schema)
    );
    println!("{}", crate::report::format_latest_table(&run.latest, &schema));
    println!(
        "{}",
        crate::report::format_region_totals(&run.rollup, config.sunburst_metric, &schema)
    );
    println!(
        "{}",
        render_time_series_ascii(&run.chart, config.plot_width, config.plot_height)
    );

    if config.export {
        write_exports(&config, &schema, &run)?;
    }

    Ok(())
}

fn write_exports(config: &RunConfig, schema: &Schema, run: &pipeline::RunOutput) -> Result<(), AppError> {
    let dir = config.output_dir.as_path();
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;

    write_time_series_svg(&svg_path(dir, &run.chart.title), &run.chart, (1200, 600))?;

    let triple = run.rollup.triple(config.sunburst_metric);
    let snapshot = run
        .snapshot_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "no data".to_string());
    let title = format!("{} ({snapshot})", schema.metric_column(config.sunburst_metric));
    write_sunburst_svg(&svg_path(dir, &title), &triple, &title, (800, 800))?;

    write_dataset_csv(&dir.join("covid_enriched.csv"), &run.enriched, schema)?;
    write_rollup_json(
        &dir.join("rollup.json"),
        &RollupFile::new(&triple, run.snapshot_date, schema),
    )?;

    info!(dir = %dir.display(), "exports written");
    Ok(())
}

fn svg_path(dir: &Path, title: &str) -> PathBuf {
    let name: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    dir.join(format!("{name}.svg"))
}

/// Load the run configuration from the process environment.
pub fn config_from_env() -> Result<RunConfig, AppError> {
    // Best-effort: load `.env` if present. Real env vars win.
    dotenvy::dotenv().ok();
    config_from_vars(|key| std::env::var(key).ok())
}

/// Build a [`RunConfig`] from a variable lookup, starting from the defaults.
pub fn config_from_vars(var: impl Fn(&str) -> Option<String>) -> Result<RunConfig, AppError> {
    let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut config = RunConfig::default();

    if let Some(url) = get("COVID_DATA_URL") {
        config.data_url = url;
    }
    config.data_file = get("COVID_DATA_FILE").map(PathBuf::from);

    if let Some(raw) = get("COVID_COUNTRIES") {
        let countries: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if countries.is_empty() {
            return Err(AppError::new(2, "COVID_COUNTRIES lists no country."));
        }
        config.countries = countries;
    }

    if let Some(days) = parse_opt::<usize>(&get, "COVID_MA_DAYS")? {
        if days == 0 {
            return Err(AppError::new(2, "COVID_MA_DAYS must be at least 1."));
        }
        config.ma_days = days;
    }
    if let Some(months) = parse_opt(&get, "COVID_PLOT_MONTHS")? {
        config.plot_months = months;
    }
    if let Some(m) = metric_opt(&get, "COVID_PLOT_METRIC")? {
        config.plot_metric = m;
    }
    if let Some(m) = metric_opt(&get, "COVID_SUNBURST_METRIC")? {
        config.sunburst_metric = m;
    }
    if let Some(raw) = get("COVID_EXPORT") {
        config.export = parse_bool("COVID_EXPORT", &raw)?;
    }
    if let Some(dir) = get("COVID_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(secs) = parse_opt(&get, "COVID_FETCH_TIMEOUT_SECS")? {
        config.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(url) = get("POPULATION_URL") {
        config.population_url = url;
    }
    if let Some(secs) = parse_opt(&get, "POPULATION_TIMEOUT_SECS")? {
        config.population_timeout = Duration::from_secs(secs);
    }
    if let Some(w) = parse_opt(&get, "COVID_PLOT_WIDTH")? {
        config.plot_width = w;
    }
    if let Some(h) = parse_opt(&get, "COVID_PLOT_HEIGHT")? {
        config.plot_height = h;
    }

    Ok(config)
}

fn parse_opt<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError> {
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::new(2, format!("Invalid {key}='{raw}'.")))
        })
        .transpose()
}

fn metric_opt(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Metric>, AppError> {
    get(key)
        .map(|raw| {
            Metric::from_key(&raw.to_ascii_lowercase()).ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "Invalid {key}='{raw}' (expected one of: new_cases, new_deaths, cumulative_cases, cumulative_deaths)."
                    ),
                )
            })
        })
        .transpose()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::new(2, format!("Invalid {key}='{raw}' (expected true/false)."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from_vars(vars(&[])).unwrap();
        assert_eq!(config.ma_days, 7);
        assert_eq!(config.plot_months, 12);
        assert_eq!(config.countries.len(), 6);
        assert!(config.countries.contains(&"Viet Nam".to_string()));
        assert!(!config.export);
        assert!(config.data_file.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from_vars(vars(&[
            ("COVID_COUNTRIES", " Chile , Peru ,"),
            ("COVID_MA_DAYS", "14"),
            ("COVID_PLOT_METRIC", "NEW_DEATHS"),
            ("COVID_EXPORT", "yes"),
            ("COVID_DATA_FILE", "data/who.csv"),
            ("POPULATION_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.countries, vec!["Chile".to_string(), "Peru".to_string()]);
        assert_eq!(config.ma_days, 14);
        assert_eq!(config.plot_metric, Metric::NewDeaths);
        assert_eq!(config.sunburst_metric, Metric::NewCases);
        assert!(config.export);
        assert_eq!(config.data_file, Some(PathBuf::from("data/who.csv")));
        assert_eq!(config.population_timeout, Duration::from_secs(3));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for (key, value) in [
            ("COVID_MA_DAYS", "0"),
            ("COVID_MA_DAYS", "seven"),
            ("COVID_PLOT_METRIC", "hospitalisations"),
            ("COVID_EXPORT", "maybe"),
            ("COVID_COUNTRIES", " , "),
        ] {
            let err = config_from_vars(vars(&[(key, value)])).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{key}={value}");
        }
    }

    #[test]
    fn svg_names_follow_titles() {
        let path = svg_path(Path::new("out"), "New Cases per Million Population (7-day Moving Average)");
        assert_eq!(
            path,
            Path::new("out").join("New Cases per Million Population (7-day Moving Average).svg")
        );
    }
}
