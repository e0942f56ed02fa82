//! Orchestration of the interactive session
//!
//! A single actor task owns [`InteractionState`]. It debounces input, runs
//! book lookups so that only the most recently dispatched one may write
//! suggestions, and runs graph generations (generate, render, sanitize)
//! concurrently, appending results in completion order. Views drive it through
//! an [`OrchestratorHandle`] and watch published snapshots.

mod config;
mod core;
mod error;
mod handle;
mod messages;
mod pipeline;
mod state;

pub use config::OrchestratorConfig;
pub use core::Orchestrator;
pub use error::{OrchestratorError, PipelineError};
pub use handle::OrchestratorHandle;
pub use messages::Command;
pub use pipeline::generate_graph;
pub use state::{EdgeSummary, Failure, FailureKind, GeneratedGraph, InputValidation, InteractionState};
