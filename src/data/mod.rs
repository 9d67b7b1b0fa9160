//! External data sources: the case-data CSV and population lookups.

pub mod population;
pub mod who;

pub use population::{PopulationLookup, RestCountriesClient, collect_populations};
pub use who::{WhoClient, read_csv_file};
