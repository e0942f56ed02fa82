//! BookSearch trait definition

use async_trait::async_trait;

use super::{CatalogError, SearchCandidate};

/// Stateless book lookup - each call is one outbound query
///
/// Implementations must preserve the order the endpoint returns records in.
/// Input validation (empty or too-short titles) is the caller's job.
#[async_trait]
pub trait BookSearch: Send + Sync {
    /// Look up books whose title matches `query`
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, CatalogError>;
}
