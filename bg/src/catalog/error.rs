//! Catalog error types

use thiserror::Error;

/// Errors that can occur while querying the book catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CatalogError::ApiError {
            status: 503,
            message: "down for maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error 503: down for maintenance");

        let err = CatalogError::InvalidResponse("missing docs".to_string());
        assert_eq!(err.to_string(), "Invalid response: missing docs");
    }
}
