//! `covid-trends` library crate.
//!
//! The binary (`covid-trends`) is a thin wrapper around this library so that:
//!
//! - the transformation core is testable without network or processes
//! - presentation stays separate from the data pipeline

pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod schema;
pub mod transform;
