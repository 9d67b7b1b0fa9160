//! Input/output helpers.
//!
//! - CSV ingest + schema validation (`ingest`)
//! - enriched dataset CSV export (`export`)
//! - rollup JSON read/write (`rollup`)

pub mod export;
pub mod ingest;
pub mod rollup;

pub use export::*;
pub use ingest::*;
pub use rollup::*;
