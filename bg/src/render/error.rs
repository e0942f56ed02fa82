//! Rendering and sanitization error types

use thiserror::Error;

/// Errors from turning diagram text into SVG
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Diagram is empty")]
    Empty,
}

impl RenderError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Errors from the allow-list sanitizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("Malformed markup at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },

    #[error("Markup has no <svg> root element")]
    NoSvgRoot,
}
