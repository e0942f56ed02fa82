//! bookgraph - book autocomplete and LLM-generated character graphs
//!
//! # Modules
//!
//! - [`catalog`] - Book lookup trait and Open Library implementation
//! - [`llm`] - Graph generation trait, Ollama implementation and system prompt
//! - [`render`] - Flowchart parser, layout, SVG writer and sanitizer
//! - [`orchestrator`] - Actor that debounces input and sequences the clients
//! - [`tui`] - Terminal front-end
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod catalog;
pub mod cli;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod render;
pub mod tui;

pub use catalog::{BookSearch, SearchCandidate};
pub use config::Config;
pub use llm::GraphGenerator;
pub use orchestrator::{GeneratedGraph, InteractionState, Orchestrator, OrchestratorHandle};
pub use render::{DiagramRenderer, TrustedSvg};
