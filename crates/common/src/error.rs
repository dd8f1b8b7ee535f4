//! Unified error type for farecal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Amadeus API error (status={status}): {message}")]
    AmadeusApi { status: u16, message: String },

    #[error("Exchange rate error: {0}")]
    Fx(String),

    #[error("Invalid month format. Use YYYY-MM")]
    InvalidMonth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Upstream HTTP status carried by this error, when there is one.
    ///
    /// Used by the request handler to derive the response status for
    /// failures that happened during a synchronous calendar compute.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::AmadeusApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}
