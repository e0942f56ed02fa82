//! Graph generation error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while asking the backend for a diagram
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerateError {
    /// Whether the backend could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        match self {
            GenerateError::Network(e) => e.is_connect(),
            GenerateError::Timeout(_) => true,
            _ => false,
        }
    }
}
