//! Terminal reports: run summary, latest-observation table, region totals.
//!
//! Formatting lives here so the transformation code never prints.

pub mod format;

pub use format::*;
