//! Error types for the lead-dashboard library.
//!
//! Field-level problems in raw backend records never show up here: the
//! adapter absorbs them into documented defaults. What remains are the
//! failures a caller has to render as state (fetch, subscription) and the
//! usual configuration and I/O errors.

use thiserror::Error;

/// Errors that can occur in the lead-dashboard library.
#[derive(Error, Debug)]
pub enum LeadError {
    /// The bulk fetch of lead rows failed (network, auth or query error)
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The bulk fetch did not complete within the configured timeout
    #[error("Fetch timed out after {0} seconds")]
    FetchTimeout(u64),

    /// The change-notification feed could not be established or broke
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// HTTP transport errors from the hosted backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid user input (dates, search terms, paths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `LeadError`
pub type Result<T> = std::result::Result<T, LeadError>;

impl LeadError {
    /// True for errors that belong to the fetch path and should leave the
    /// repository in its failed-load state.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::FetchTimeout(_) | Self::Http(_))
    }
}

impl From<anyhow::Error> for LeadError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<config::ConfigError> for LeadError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
