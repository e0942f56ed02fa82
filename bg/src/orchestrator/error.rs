//! Orchestrator error types

use thiserror::Error;

use super::state::FailureKind;
use crate::llm::GenerateError;
use crate::render::{RenderError, SanitizeError};

/// Errors from talking to the orchestrator task
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Orchestrator channel closed")]
    ChannelClosed,
}

/// Errors from one generate, render, sanitize cycle
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Sanitize(#[from] SanitizeError),
}

impl PipelineError {
    /// Which stage failed, as reported to the view
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Generate(_) => FailureKind::Generation,
            PipelineError::Render(_) | PipelineError::Sanitize(_) => FailureKind::Render,
        }
    }
}
