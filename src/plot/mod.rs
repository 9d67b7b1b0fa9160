//! Chart rendering.
//!
//! - time-series line chart, SVG (`timeseries`)
//! - nested-proportion sunburst, SVG (`sunburst`)
//! - terminal rendering of the time series (`ascii`)
//!
//! Renderers only consume prepared data ([`TimeSeriesChart`], rollup triples);
//! nothing here touches the transformation core.

pub mod ascii;
pub mod sunburst;
pub mod timeseries;

pub use ascii::*;
pub use sunburst::*;
pub use timeseries::*;

/// Comma-grouped integer label, e.g. `12345.6` -> `12,345`.
///
/// Truncates toward zero like an integer cast.
pub fn format_thousands(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let n = v.trunc() as i64;
    let digits = n.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
