//! Static dashboard fixtures served verbatim from the data directory.

use std::path::PathBuf;

use thiserror::Error;

/// Route → fixture file. Every route is a direct passthrough.
pub const FIXTURE_ROUTES: &[(&str, &str)] = &[
    ("/api/dashboard", "dashboard.json"),
    ("/api/analytics", "analytics.json"),
    ("/api/incidents", "incidents.json"),
    ("/api/reports", "reports.json"),
    ("/api/scraper", "scraper.json"),
    ("/api/capabilities", "capabilities.json"),
    ("/api/suggested-queries", "suggested_queries.json"),
];

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Fixture not found: {0}")]
    NotFound(String),

    #[error("IO error reading fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fixture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct FixtureDir {
    root: PathBuf,
}

impl FixtureDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read and parse `<root>/<file>`.
    pub async fn read(&self, file: &str) -> Result<serde_json::Value, FixtureError> {
        let path = self.root.join(file);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FixtureError::NotFound(file.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
