//! Book lookup module
//!
//! Wraps a single outbound query to a public catalog search endpoint and maps
//! the response into autocomplete candidates.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openlibrary;
mod types;

pub use client::BookSearch;
pub use error::CatalogError;
pub use openlibrary::OpenLibraryClient;
pub use types::SearchCandidate;

use crate::config::CatalogConfig;

/// Create the book search client described by config
pub fn create_client(config: &CatalogConfig) -> Result<Arc<dyn BookSearch>, CatalogError> {
    debug!(base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OpenLibraryClient::from_config(config)?))
}
