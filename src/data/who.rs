//! WHO global case-data CSV source.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::error::AppError;

pub struct WhoClient {
    client: Client,
    url: String,
}

impl WhoClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Download the full CSV body.
    pub fn fetch_csv(&self) -> Result<String, AppError> {
        info!(url = %self.url, "fetching case data");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("Case data request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Case data request failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read case data body: {e}")))?;
        info!(bytes = body.len(), "case data downloaded");
        Ok(body)
    }
}

/// Read a previously downloaded CSV from disk.
pub fn read_csv_file(path: &Path) -> Result<String, AppError> {
    info!(path = %path.display(), "reading case data from file");
    fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read CSV '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_local_file_is_an_io_error() {
        let err = read_csv_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("here.csv"));
    }

    #[test]
    fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        std::fs::write(&path, "Country\nChile\n").unwrap();
        assert_eq!(read_csv_file(&path).unwrap(), "Country\nChile\n");
    }
}
