//! Nested-proportion ("sunburst") chart.
//!
//! Plotters has no sunburst series, so wedges are laid out here and drawn as
//! filled polygons. Branch values are "total": a child's angular span is its
//! share of the parent's value, and children exactly fill their parent when
//! the rollup conserves sums.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{Palette, Palette99};
use tracing::info;

use crate::error::AppError;
use crate::plot::format_thousands;
use crate::transform::RollupTriple;

/// Angular span of one node, in radians clockwise from 12 o'clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub id: String,
    pub label: String,
    pub depth: usize,
    /// Index of the depth-1 ancestor (used for coloring); `None` for the root.
    pub branch: Option<usize>,
    pub start: f64,
    pub end: f64,
    pub value: f64,
}

impl Wedge {
    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// Lay out every node with a positive share of its parent.
pub fn layout_sunburst(triple: &RollupTriple) -> Vec<Wedge> {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut root = None;
    for (idx, parent) in triple.parents.iter().enumerate() {
        if parent.is_empty() {
            root.get_or_insert(idx);
        } else {
            children.entry(parent.as_str()).or_default().push(idx);
        }
    }

    let Some(root) = root else { return Vec::new() };

    let mut wedges = Vec::with_capacity(triple.ids.len());
    let mut stack = vec![(root, 0usize, None, 0.0, TAU)];

    while let Some((idx, depth, branch, start, end)) = stack.pop() {
        let value = triple.values[idx].max(0.0);
        wedges.push(Wedge {
            id: triple.ids[idx].clone(),
            label: triple.labels[idx].clone(),
            depth,
            branch,
            start,
            end,
            value,
        });

        if value <= 0.0 {
            continue;
        }
        let Some(kids) = children.get(triple.ids[idx].as_str()) else { continue };

        let mut cursor = start;
        let mut next = Vec::with_capacity(kids.len());
        for (k, &child) in kids.iter().enumerate() {
            let share = triple.values[child].max(0.0) / value;
            let child_end = cursor + share * (end - start);
            if child_end > cursor {
                let child_branch = if depth == 0 { Some(k) } else { branch };
                next.push((child, depth + 1, child_branch, cursor, child_end));
            }
            cursor = child_end;
        }
        // Reverse so wedges come out in input order.
        stack.extend(next.into_iter().rev());
    }

    wedges
}

/// Render the rollup as an SVG sunburst.
pub fn write_sunburst_svg(
    path: &Path,
    triple: &RollupTriple,
    title: &str,
    size: (u32, u32),
) -> Result<(), AppError> {
    let wedges = layout_sunburst(triple);
    draw_sunburst(path, &wedges, title, size)
        .map_err(|e| AppError::new(5, format!("Failed to render sunburst '{}': {e}", path.display())))?;
    info!(path = %path.display(), nodes = wedges.len(), "wrote sunburst chart");
    Ok(())
}

fn draw_sunburst(
    path: &Path,
    wedges: &[Wedge],
    title: &str,
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(title, ("sans-serif", 18).into_font())?;

    let (w, h) = area.dim_in_pixel();
    let center = (f64::from(w) / 2.0, f64::from(h) / 2.0);
    let radius = (f64::from(w.min(h)) / 2.0 - 10.0).max(10.0);
    let rings = wedges.iter().map(|w| w.depth).max().unwrap_or(0) + 1;
    let ring = radius / rings as f64;

    let centered = Pos::new(HPos::Center, VPos::Center);

    for wedge in wedges {
        let color = wedge_color(wedge);
        let inner = wedge.depth as f64 * ring;
        let outer = inner + ring;

        let outline = annular_sector(center, inner, outer, wedge.start, wedge.end);
        area.draw(&Polygon::new(outline.clone(), color.filled()))?;
        let mut closed = outline;
        if let Some(&first) = closed.first() {
            closed.push(first);
        }
        area.draw(&PathElement::new(closed, WHITE.stroke_width(1)))?;

        // Label wedges with enough arc length to hold a few characters.
        let mid_r = if wedge.depth == 0 { 0.0 } else { (inner + outer) / 2.0 };
        if wedge.depth > 0 && wedge.span() * mid_r < 36.0 {
            continue;
        }
        let mid_a = (wedge.start + wedge.end) / 2.0;
        let at = polar(center, mid_r, mid_a);
        let font_size = if wedge.depth <= 1 { 12 } else { 10 };
        let style = ("sans-serif", font_size).into_font().color(&BLACK).pos(centered);
        area.draw(&Text::new(wedge.label.clone(), at, style.clone()))?;
        if wedge.depth == 0 {
            area.draw(&Text::new(format_thousands(wedge.value), (at.0, at.1 + 16), style))?;
        }
    }

    root.present()?;
    Ok(())
}

fn wedge_color(wedge: &Wedge) -> RGBColor {
    match wedge.branch {
        None => RGBColor(235, 235, 235),
        Some(b) => {
            let (r, g, bl) = Palette99::pick(b).to_backend_color().rgb;
            // Deeper rings fade toward white.
            let t = (wedge.depth.saturating_sub(1) as f64 * 0.35).min(0.8);
            let mix = |c: u8| (f64::from(c) + (255.0 - f64::from(c)) * t).round() as u8;
            RGBColor(mix(r), mix(g), mix(bl))
        }
    }
}

/// Polygon outline between two radii; a zero inner radius gives a pie slice.
fn annular_sector(center: (f64, f64), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = ((end - start) / 0.02).ceil().max(2.0) as usize;
    let angle = |i: usize| start + (end - start) * i as f64 / steps as f64;

    let mut points: Vec<(i32, i32)> = (0..=steps).map(|i| polar(center, outer, angle(i))).collect();
    if inner > 0.0 {
        points.extend((0..=steps).rev().map(|i| polar(center, inner, angle(i))));
    } else if end - start < TAU - 1e-9 {
        points.push(polar(center, 0.0, start));
    }
    points
}

fn polar(center: (f64, f64), r: f64, a: f64) -> (i32, i32) {
    (
        (center.0 + r * a.sin()).round() as i32,
        (center.1 - r * a.cos()).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityPath, MetricValues, Observation, SeriesKind};
    use crate::schema::{Metric, Region};
    use crate::transform::build_rollup;
    use chrono::NaiveDate;

    fn triple() -> RollupTriple {
        let leaf = |region, country: &str, v: f64| {
            Observation::new(
                EntityPath::new(Some(region), country),
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                SeriesKind::Actual,
                MetricValues::default().with(Metric::NewCases, v),
            )
        };
        let leaves = vec![
            leaf(Region::Europe, "CountryA", 10.0),
            leaf(Region::Europe, "CountryB", 20.0),
            leaf(Region::Africa, "CountryC", 5.0),
        ];
        build_rollup(&leaves, "World").triple(Metric::NewCases)
    }

    fn wedge<'a>(wedges: &'a [Wedge], id: &str) -> &'a Wedge {
        wedges.iter().find(|w| w.id == id).unwrap()
    }

    #[test]
    fn spans_are_proportional_to_totals() {
        let wedges = layout_sunburst(&triple());
        assert_eq!(wedges.len(), 6);

        let root = wedge(&wedges, "World");
        assert_eq!(root.depth, 0);
        assert!((root.span() - TAU).abs() < 1e-12);

        let europe = wedge(&wedges, "World/Europe");
        assert!((europe.span() - TAU * 30.0 / 35.0).abs() < 1e-9);

        let b = wedge(&wedges, "World/Europe/CountryB");
        assert_eq!(b.depth, 2);
        assert!((b.span() - europe.span() * 20.0 / 30.0).abs() < 1e-9);
        assert_eq!(b.branch, europe.branch);
    }

    #[test]
    fn children_fill_their_parent() {
        let wedges = layout_sunburst(&triple());
        for parent in wedges.iter().filter(|w| w.depth < 2) {
            let prefix = format!("{}/", parent.id);
            let kids: Vec<&Wedge> = wedges
                .iter()
                .filter(|w| w.depth == parent.depth + 1 && w.id.starts_with(&prefix))
                .collect();
            let total: f64 = kids.iter().map(|w| w.span()).sum();
            assert!((total - parent.span()).abs() < 1e-9, "{}", parent.id);
            for k in kids {
                assert!(k.start >= parent.start - 1e-12 && k.end <= parent.end + 1e-12);
            }
        }
    }

    #[test]
    fn zero_root_lays_out_root_only() {
        let mut t = triple();
        t.values.iter_mut().for_each(|v| *v = 0.0);
        let wedges = layout_sunburst(&t);
        assert_eq!(wedges.len(), 1);
        assert_eq!(wedges[0].label, "World");
    }

    #[test]
    fn renders_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunburst.svg");
        write_sunburst_svg(&path, &triple(), "New Cases (2024-05-01)", (600, 600)).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("Europe"));
        assert!(svg.contains("35"));
    }
}
