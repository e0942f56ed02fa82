//! Message types for the orchestrator task

use crate::catalog::{CatalogError, SearchCandidate};

/// Commands sent from handles to the orchestrator task
#[derive(Debug)]
pub enum Command {
    /// The input value changed (keystroke, accepted suggestion or clear)
    Input(String),

    /// Generate a graph for a confirmed title
    Generate(String),

    /// Clear the failure banner
    DismissFailure,

    /// Stop the task, aborting in-flight work
    Shutdown,
}

/// Result of one dispatched search, tagged with its sequence number
#[derive(Debug)]
pub(crate) struct SearchCompletion {
    pub seq: u64,
    pub query: String,
    pub result: Result<Vec<SearchCandidate>, CatalogError>,
}
