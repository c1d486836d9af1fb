//! Error types for the bookmark harvester.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while harvesting bookmarks.
#[derive(Debug, Error)]
pub enum Error {
    /// Browser automation failed (launch, CDP command, navigation).
    #[error("Browser error: {0}")]
    Browser(String),

    /// Login did not complete or the session is not authenticated.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A wait exceeded its deadline.
    #[error("Timed out after {}ms waiting for {what}", after.as_millis())]
    Timeout { what: String, after: Duration },

    /// None of the candidate selectors matched.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;
