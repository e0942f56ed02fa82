//! Interaction state owned by the orchestrator
//!
//! Everything here is plain data. The orchestrator task is the only writer;
//! views get cloned snapshots.

use std::fmt;

use uuid::Uuid;

use crate::catalog::SearchCandidate;
use crate::render::{Diagram, TrustedSvg};

/// Validation of the title input, as shown under the input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputValidation {
    Required,
    TooShort { min: usize },
    Valid,
}

impl InputValidation {
    /// Validate `input` against a minimum length counted in characters after trimming
    pub fn validate(input: &str, min_len: usize) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            InputValidation::Required
        } else if trimmed.chars().count() < min_len {
            InputValidation::TooShort { min: min_len }
        } else {
            InputValidation::Valid
        }
    }

    pub fn is_valid(self) -> bool {
        self == InputValidation::Valid
    }

    /// User-facing error text, if any
    pub fn message(self) -> Option<String> {
        match self {
            InputValidation::Required => Some("Book name is required".to_string()),
            InputValidation::TooShort { min } => Some(format!("Book title must be at least {min} characters long")),
            InputValidation::Valid => None,
        }
    }
}

/// One relationship from a generated graph, by display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSummary {
    pub from: String,
    pub label: Option<String>,
    pub to: String,
}

impl fmt::Display for EdgeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} --{}--> {}", self.from, label, self.to),
            None => write!(f, "{} --> {}", self.from, self.to),
        }
    }
}

/// A successfully generated and sanitized graph
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedGraph {
    pub id: Uuid,
    pub subject_title: String,
    pub visual: TrustedSvg,
    /// Diagram text as returned by the generator
    pub source: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub edges: Vec<EdgeSummary>,
}

impl GeneratedGraph {
    pub fn new(id: Uuid, subject_title: &str, source: String, diagram: &Diagram, visual: TrustedSvg) -> Self {
        let flatten = |s: &str| s.replace('\n', " ");
        let edges = diagram
            .edges
            .iter()
            .map(|e| EdgeSummary {
                from: flatten(diagram.label_of(&e.from)),
                label: e.label.as_deref().map(flatten),
                to: flatten(diagram.label_of(&e.to)),
            })
            .collect();

        Self {
            id,
            subject_title: subject_title.to_string(),
            visual,
            source,
            node_count: diagram.nodes.len(),
            edge_count: diagram.edges.len(),
            edges,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Search,
    Generation,
    Render,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Search => "Search",
            FailureKind::Generation => "Generation",
            FailureKind::Render => "Render",
        };
        f.write_str(s)
    }
}

/// The most recent failure, kept until dismissed or replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Query or book title the failed operation was for
    pub subject: String,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for '{}': {}", self.kind, self.subject, self.message)
    }
}

/// Snapshot of everything the view shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    pub input_value: String,
    pub candidates: Vec<SearchCandidate>,
    pub is_loading: bool,
    /// Oldest first, in completion order
    pub generated_graphs: Vec<GeneratedGraph>,
    /// Titles with a generation in flight
    pub generating: Vec<String>,
    pub last_failure: Option<Failure>,
}

impl InteractionState {
    pub fn validation(&self, min_len: usize) -> InputValidation {
        InputValidation::validate(&self.input_value, min_len)
    }

    /// Whether the generate action is enabled
    pub fn can_generate(&self, min_len: usize) -> bool {
        self.validation(min_len).is_valid() && !self.candidates.is_empty()
    }
}
