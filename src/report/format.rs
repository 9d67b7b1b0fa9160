//! Plain-text formatting for stdout.

use crate::domain::{Dataset, Observation, RunConfig, SeriesKind};
use crate::error::Skipped;
use crate::io::ingest::IngestedData;
use crate::plot::format_thousands;
use crate::schema::{Field, Metric, Schema};
use crate::transform::{NodeLevel, Rollup};

/// Format the run summary (source stats, selection, smoothing, diagnostics).
pub fn format_run_summary(
    ingest: &IngestedData,
    enriched: &Dataset,
    skipped: &[Skipped],
    config: &RunConfig,
    schema: &Schema,
) -> String {
    let mut out = String::new();

    out.push_str("=== covid-trends - WHO COVID-19 trends ===\n");
    out.push_str(&format!(
        "Source rows: read={} used={}\n",
        ingest.rows_read, ingest.rows_used
    ));
    match &ingest.stats {
        Some(s) => out.push_str(&format!(
            "Dataset: rows={} | countries={} | dates=[{}, {}]\n",
            s.n_rows, s.n_countries, s.first_date, s.last_date
        )),
        None => out.push_str("Dataset: empty\n"),
    }

    out.push_str(&format!("Selected: {}\n", config.countries.join(", ")));

    let kind = SeriesKind::MovingAverage { days: config.ma_days };
    let actual = enriched.of_kind(SeriesKind::Actual).count();
    let smoothed = enriched.of_kind(kind).count();
    out.push_str(&format!(
        "Smoothing: {} | actual={actual} smoothed={smoothed}\n",
        kind.label()
    ));
    out.push_str(&format!(
        "Chart: {} | last {} month(s)\n",
        schema.per_million_column(config.plot_metric),
        config.plot_months
    ));

    out.push_str("\nDiagnostics:\n");
    if skipped.is_empty() {
        out.push_str("  none\n");
    }
    for s in skipped {
        out.push_str(&format!("  (skipped) {s}\n"));
    }

    out
}

/// Latest valid observation per country, one row each.
pub fn format_latest_table(latest: &[Observation], schema: &Schema) -> String {
    let cases = schema.metric_column(Metric::NewCases);
    let deaths = schema.metric_column(Metric::NewDeaths);

    let mut out = String::new();
    out.push_str(&format!("Latest observations ({} countries):\n", latest.len()));
    out.push_str(
        format!(
            "{:<28} {:<22} {:<10} {:>12} {:>12}\n",
            schema.column(Field::Country),
            schema.column(Field::Region),
            "date",
            cases,
            deaths
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<22} {:-<10} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for row in latest {
        let region = row.entity.region.map(|r| r.display_name()).unwrap_or("");
        out.push_str(
            format!(
                "{:<28} {:<22} {:<10} {:>12} {:>12}\n",
                truncate(row.country(), 28),
                truncate(region, 22),
                row.date,
                fmt_count(row.metrics.get(Metric::NewCases)),
                fmt_count(row.metrics.get(Metric::NewDeaths)),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Root and region totals of the rollup for one metric.
pub fn format_region_totals(rollup: &Rollup, metric: Metric, schema: &Schema) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} by region:\n", schema.metric_column(metric)));

    for node in &rollup.nodes {
        let indent = match node.level {
            NodeLevel::Root => "",
            NodeLevel::Region => "  ",
            NodeLevel::Leaf => continue,
        };
        let width = 30 - indent.len();
        out.push_str(&format!(
            "{indent}{:<width$} {:>12}\n",
            truncate(&node.label, width),
            fmt_count(node.values.get(metric)),
        ));
    }

    out
}

fn fmt_count(v: Option<f64>) -> String {
    v.map(format_thousands).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
