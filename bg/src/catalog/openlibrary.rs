//! Open Library search client
//!
//! Implements BookSearch against `GET /search.json?title=...`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{BookSearch, CatalogError, SearchCandidate};
use crate::config::CatalogConfig;

/// Open Library API client
pub struct OpenLibraryClient {
    base_url: String,
    limit: Option<u32>,
    http: Client,
}

impl OpenLibraryClient {
    /// Create a new client from configuration
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        debug!(?config, "from_config: called");
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(CatalogError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
            http,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search.json", self.base_url)
    }

    /// Query parameters for a title search
    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![("title", query.to_string())];
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }

    /// Map the response envelope into candidates, keeping endpoint order
    fn parse_response(api_response: SearchResponse) -> Vec<SearchCandidate> {
        debug!(doc_count = api_response.docs.len(), "parse_response: called");
        api_response
            .docs
            .into_iter()
            .map(|doc| SearchCandidate {
                title: doc.title,
                authors: doc.author_name,
            })
            .collect()
    }
}

#[async_trait]
impl BookSearch for OpenLibraryClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, CatalogError> {
        debug!(%query, "search: called");
        let response = self
            .http
            .get(self.search_url())
            .query(&self.query_params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "search: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.text().await?;
        let api_response: SearchResponse = serde_json::from_str(&body)?;
        let candidates = Self::parse_response(api_response);
        debug!(count = candidates.len(), "search: success");
        Ok(candidates)
    }
}

// Open Library response types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
}
