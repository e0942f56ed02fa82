//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Quiet period after the last keystroke before a search is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Shortest (trimmed) input that is worth searching for
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Channel buffer size for handle commands
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_debounce_ms() -> u64 {
    debug!("default_debounce_ms: called");
    400
}

fn default_min_query_len() -> usize {
    debug!("default_min_query_len: called");
    4
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    64
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        debug!("OrchestratorConfig::default: called");
        Self {
            debounce_ms: 400,
            min_query_len: 4,
            channel_buffer: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Get the debounce window as a Duration
    pub fn debounce(&self) -> Duration {
        debug!(debounce_ms = %self.debounce_ms, "OrchestratorConfig::debounce: called");
        Duration::from_millis(self.debounce_ms)
    }
}
