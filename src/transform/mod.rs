//! The data-transformation core.
//!
//! - trailing moving averages with edge trimming (`moving_average`)
//! - per-capita normalization (`population`)
//! - latest valid observation per country (`latest`)
//! - root/region/country rollups (`rollup`)

pub mod latest;
pub mod moving_average;
pub mod population;
pub mod rollup;

pub use latest::*;
pub use moving_average::*;
pub use population::*;
pub use rollup::*;
