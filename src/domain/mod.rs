//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the observation row shape (`Observation`, `EntityPath`, `MetricValues`)
//! - series kinds (`SeriesKind`)
//! - the keyed row collection (`Dataset`)
//! - run configuration (`RunConfig`)

pub mod types;

pub use types::*;
