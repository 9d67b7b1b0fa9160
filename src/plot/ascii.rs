//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, kept deterministic so it can be snapshot-tested.
//!
//! Plot elements:
//! - one letter per country line (`A`, `B`, ...), listed in a legend
//! - y axis floored at zero

use crate::plot::format_thousands;
use crate::plot::timeseries::{TimeSeriesChart, day_number};

/// Render a prepared time-series chart as text.
pub fn render_time_series_ascii(chart: &TimeSeriesChart, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (d0, d1) = chart.x_bounds();
    let (x_min, x_max) = (day_number(d0), day_number(d1));
    let y_top = chart.y_max();
    let (y_min, y_max) = (0.0, if y_top > 0.0 { y_top * 1.05 } else { 1.0 });

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | date=[{d0}, {d1}] | y=[0, {}]\n",
        chart.title,
        format_thousands(y_top),
    ));

    if chart.is_empty() {
        out.push_str("(no data to plot)\n");
        return out;
    }

    let mut grid = vec![vec![' '; width]; height];

    for (idx, line) in chart.lines.iter().enumerate() {
        let ch = line_marker(idx);
        for segment in &line.segments {
            let mut prev = None;
            for &(date, v) in segment {
                let x = map_x(day_number(date), x_min, x_max, width);
                let y = map_y(v, y_min, y_max, height);
                match prev {
                    Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, ch),
                    None => {
                        if grid[y][x] == ' ' {
                            grid[y][x] = ch;
                        }
                    }
                }
                prev = Some((x, y));
            }
        }
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    for (idx, line) in chart.lines.iter().enumerate() {
        out.push_str(&format!("{} = {}\n", line_marker(idx), line.label));
    }

    out
}

fn line_marker(idx: usize) -> char {
    (b'A' + (idx % 26) as u8) as char
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Never overwrites an earlier line.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::timeseries::SeriesLine;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn chart(lines: Vec<SeriesLine>) -> TimeSeriesChart {
        TimeSeriesChart {
            title: "New Cases per Million Population (Actual)".to_string(),
            x_label: "Date Reported".to_string(),
            y_label: "New Cases per Million Population".to_string(),
            date_from: day(1),
            lines,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let c = chart(vec![
            SeriesLine {
                label: "Malaysia".to_string(),
                segments: vec![vec![(day(1), 0.0), (day(5), 0.0)]],
            },
            SeriesLine {
                label: "Thailand".to_string(),
                segments: vec![vec![(day(1), 10.0), (day(5), 10.0)]],
            },
        ]);

        let txt = render_time_series_ascii(&c, 10, 5);
        let expected = concat!(
            "Plot: New Cases per Million Population (Actual) | date=[2024-04-01, 2024-04-05] | y=[0, 10]\n",
            "BBBBBBBBBB\n",
            "          \n",
            "          \n",
            "          \n",
            "AAAAAAAAAA\n",
            "A = Malaysia\n",
            "B = Thailand\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn segments_are_not_joined() {
        let c = chart(vec![SeriesLine {
            label: "Malaysia".to_string(),
            segments: vec![vec![(day(1), 0.0)], vec![(day(10), 0.0)]],
        }]);
        let txt = render_time_series_ascii(&c, 10, 5);
        let bottom = txt.lines().nth(5).unwrap();
        assert_eq!(bottom, "A        A");
    }

    #[test]
    fn empty_chart_says_so() {
        let txt = render_time_series_ascii(&chart(Vec::new()), 20, 5);
        assert!(txt.ends_with("(no data to plot)\n"));
    }
}
