//! Per-country time-series line chart.
//!
//! Data prep ([`prepare_time_series`]) is kept apart from drawing so the same
//! [`TimeSeriesChart`] feeds both the SVG renderer and the terminal plot.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use plotters::style::{FontStyle, FontTransform, Palette, Palette99};
use tracing::info;

use crate::domain::{Dataset, Observation, SeriesKind};
use crate::error::AppError;
use crate::plot::format_thousands;
use crate::schema::{Field, Metric, Schema};

/// One line of the chart. A line breaks into segments wherever a value is
/// missing or a day is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLine {
    pub label: String,
    pub segments: Vec<Vec<(NaiveDate, f64)>>,
}

impl SeriesLine {
    pub fn points(&self) -> impl Iterator<Item = &(NaiveDate, f64)> {
        self.segments.iter().flatten()
    }
}

/// A render-ready chart description.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub date_from: NaiveDate,
    pub lines: Vec<SeriesLine>,
}

impl TimeSeriesChart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First and last plotted date (falls back to a one-day span at `date_from`).
    pub fn x_bounds(&self) -> (NaiveDate, NaiveDate) {
        let dates = || self.lines.iter().flat_map(|l| l.points().map(|p| p.0));
        match (dates().min(), dates().max()) {
            (Some(min), Some(max)) if max > min => (min, max),
            (Some(min), _) => (min, min.succ_opt().unwrap_or(min)),
            _ => (self.date_from, self.date_from.succ_opt().unwrap_or(self.date_from)),
        }
    }

    /// Largest plotted value, or `0` for an empty chart.
    pub fn y_max(&self) -> f64 {
        self.lines
            .iter()
            .flat_map(|l| l.points().map(|p| p.1))
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Select `kind` rows of `countries` dated on or after `date_from` and chart
/// their per-million `metric`.
///
/// Countries without any plottable value are left out.
pub fn prepare_time_series(
    dataset: &Dataset,
    schema: &Schema,
    kind: SeriesKind,
    metric: Metric,
    countries: &[String],
    date_from: NaiveDate,
) -> TimeSeriesChart {
    let y_label = schema.per_million_column(metric);

    let lines = countries
        .iter()
        .filter_map(|country| {
            let mut rows: Vec<&Observation> = dataset
                .of_kind(kind)
                .filter(|r| r.country() == country.trim() && r.date >= date_from)
                .collect();
            rows.sort_by_key(|r| r.date);

            let segments = split_segments(rows.iter().map(|r| (r.date, r.per_million.get(metric))));
            if segments.is_empty() {
                return None;
            }
            Some(SeriesLine {
                label: country.trim().to_string(),
                segments,
            })
        })
        .collect();

    TimeSeriesChart {
        title: format!("{y_label} ({kind})"),
        x_label: schema.column(Field::Date).to_string(),
        y_label,
        date_from,
        lines,
    }
}

fn split_segments(points: impl Iterator<Item = (NaiveDate, Option<f64>)>) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut segments: Vec<Vec<(NaiveDate, f64)>> = Vec::new();
    let mut current: Vec<(NaiveDate, f64)> = Vec::new();

    for (date, value) in points {
        let contiguous = current
            .last()
            .is_some_and(|&(prev, _)| (date - prev).num_days() == 1);
        if !contiguous && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        match value {
            Some(v) if v.is_finite() => current.push((date, v)),
            _ => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Write the chart as an SVG file.
pub fn write_time_series_svg(path: &Path, chart: &TimeSeriesChart, size: (u32, u32)) -> Result<(), AppError> {
    draw_time_series(path, chart, size)
        .map_err(|e| AppError::new(5, format!("Failed to render chart '{}': {e}", path.display())))?;
    info!(path = %path.display(), lines = chart.lines.len(), "wrote time-series chart");
    Ok(())
}

fn draw_time_series(
    path: &Path,
    chart: &TimeSeriesChart,
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (d0, d1) = chart.x_bounds();
    let (x0, x1) = (day_number(d0), day_number(d1));
    let y1 = y_ceiling(chart.y_max());
    // One tick per week.
    let weeks = ((x1 - x0) / 7.0).ceil().max(1.0) as usize;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 16).into_font().style(FontStyle::Bold))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 64)
        .set_label_area_size(LabelAreaPosition::Bottom, 72)
        .build_cartesian_2d(x0..x1, 0.0..y1)?;

    // Axes only: no grid, no top/right spines, y floor pinned at zero.
    ctx.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(weeks)
        .y_labels(8)
        .x_label_formatter(&|v| fmt_day(*v))
        .y_label_formatter(&|v| format_thousands(*v))
        .x_label_style(("sans-serif", 9).into_font().transform(FontTransform::Rotate90))
        .y_label_style(("sans-serif", 9).into_font())
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()?;

    for (idx, line) in chart.lines.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        for (seg_idx, segment) in line.segments.iter().enumerate() {
            let drawn = ctx.draw_series(LineSeries::new(
                segment.iter().map(|&(d, v)| (day_number(d), v)),
                color.stroke_width(2),
            ))?;
            if seg_idx == 0 {
                drawn
                    .label(line.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
        }
    }

    if !chart.is_empty() {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", 10).into_font())
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

pub(crate) fn day_number(d: NaiveDate) -> f64 {
    f64::from(d.num_days_from_ce())
}

pub(crate) fn fmt_day(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn y_ceiling(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 { max * 1.05 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityPath, MetricValues};
    use crate::schema::Region;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn row(country: &str, d: u32, kind: SeriesKind, per_million: Option<f64>) -> Observation {
        let mut obs = Observation::new(
            EntityPath::new(Some(Region::SouthEastAsia), country),
            day(d),
            kind,
            MetricValues::default(),
        );
        obs.per_million.set(Metric::NewCases, per_million);
        obs
    }

    fn sample() -> Dataset {
        let ma = SeriesKind::MovingAverage { days: 7 };
        Dataset::from_rows(vec![
            row("Malaysia", 1, ma, Some(1.0)),
            row("Malaysia", 2, ma, Some(2.0)),
            row("Malaysia", 3, ma, None),
            row("Malaysia", 4, ma, Some(4.0)),
            row("Malaysia", 4, SeriesKind::Actual, Some(40.0)),
            row("Thailand", 2, ma, Some(9.0)),
            row("Laos", 2, ma, None),
        ])
        .unwrap()
    }

    #[test]
    fn prepares_one_line_per_country_with_segments() {
        let countries = vec!["Malaysia".to_string(), "Thailand".to_string(), "Laos".to_string()];
        let chart = prepare_time_series(
            &sample(),
            &Schema::who(),
            SeriesKind::MovingAverage { days: 7 },
            Metric::NewCases,
            &countries,
            day(1),
        );

        assert_eq!(
            chart.title,
            "New Cases per Million Population (7-day Moving Average)"
        );
        assert_eq!(chart.x_label, "Date Reported");
        assert_eq!(chart.lines.len(), 2, "Laos has nothing to plot");

        let malaysia = &chart.lines[0];
        assert_eq!(
            malaysia.segments,
            vec![vec![(day(1), 1.0), (day(2), 2.0)], vec![(day(4), 4.0)]]
        );
        assert_eq!(chart.y_max(), 9.0);
        assert_eq!(chart.x_bounds(), (day(1), day(4)));
    }

    #[test]
    fn date_from_trims_history() {
        let chart = prepare_time_series(
            &sample(),
            &Schema::who(),
            SeriesKind::MovingAverage { days: 7 },
            Metric::NewCases,
            &["Malaysia".to_string()],
            day(3),
        );
        assert_eq!(chart.lines[0].segments, vec![vec![(day(4), 4.0)]]);
    }

    #[test]
    fn empty_chart_has_sane_bounds() {
        let chart = prepare_time_series(
            &sample(),
            &Schema::who(),
            SeriesKind::Actual,
            Metric::NewCases,
            &["Atlantis".to_string()],
            day(1),
        );
        assert!(chart.is_empty());
        assert_eq!(chart.x_bounds(), (day(1), day(2)));
        assert_eq!(chart.y_max(), 0.0);
    }

    #[test]
    fn day_numbers_format_back_to_dates() {
        assert_eq!(fmt_day(day_number(day(15))), "2024-04-15");
    }

    #[test]
    fn renders_svg_file() {
        let countries = vec!["Malaysia".to_string(), "Thailand".to_string()];
        let chart = prepare_time_series(
            &sample(),
            &Schema::who(),
            SeriesKind::MovingAverage { days: 7 },
            Metric::NewCases,
            &countries,
            day(1),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        write_time_series_svg(&path, &chart, (800, 400)).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Malaysia"));
    }
}
