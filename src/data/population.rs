//! Population lookups.
//!
//! The normalizer only needs a country → headcount table. Where it comes from
//! is behind [`PopulationLookup`], so the HTTP client (with its own timeout)
//! can be swapped for a static table in tests or offline runs.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AppError;

/// Resolves a country display name to a headcount.
pub trait PopulationLookup {
    /// `Ok(None)` when the country is unknown to the source; `Err` only when
    /// the source itself could not be reached.
    fn population(&self, country: &str) -> Result<Option<u64>, AppError>;
}

impl PopulationLookup for HashMap<String, u64> {
    fn population(&self, country: &str) -> Result<Option<u64>, AppError> {
        Ok(self.get(country).copied())
    }
}

/// restcountries.com client.
pub struct RestCountriesClient {
    client: Client,
    url_root: String,
}

impl RestCountriesClient {
    pub fn new(url_root: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url_root: url_root.into(),
        })
    }

    fn country_url(&self, country: &str) -> String {
        format!("{}{}", self.url_root, country_slug(country))
    }
}

impl PopulationLookup for RestCountriesClient {
    fn population(&self, country: &str) -> Result<Option<u64>, AppError> {
        let url = self.country_url(country);
        let resp = self
            .client
            .get(&url)
            .query(&[("fields", "population")])
            .send()
            .map_err(|e| AppError::new(4, format!("Population request for {country} failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!(
                    "Population request for {country} failed with status {}.",
                    resp.status()
                ),
            ));
        }

        let body: Vec<PopulationEntry> = resp.json().map_err(|e| {
            AppError::new(4, format!("Failed to parse population response for {country}: {e}"))
        })?;

        Ok(body.first().map(|e| e.population))
    }
}

#[derive(Debug, Deserialize)]
struct PopulationEntry {
    population: u64,
}

/// Lowercased name with all whitespace removed (`Viet Nam` -> `vietnam`).
fn country_slug(country: &str) -> String {
    country
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Look up every country once and collect the hits.
///
/// Misses are simply absent from the returned table.
pub fn collect_populations(
    lookup: &dyn PopulationLookup,
    countries: &[String],
) -> Result<HashMap<String, u64>, AppError> {
    let mut table = HashMap::with_capacity(countries.len());
    for country in countries {
        match lookup.population(country)? {
            Some(p) => {
                debug!(%country, population = p, "population found");
                table.insert(country.clone(), p);
            }
            None => debug!(%country, "population not found"),
        }
    }
    info!(requested = countries.len(), found = table.len(), "population lookups complete");
    Ok(table)
}
