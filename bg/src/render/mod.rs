//! Diagram rendering
//!
//! Converts diagram-description text (Mermaid flowchart syntax) into SVG and
//! passes it through an allow-list sanitizer. The orchestrator only sees the
//! [`DiagramRenderer`] trait and the [`TrustedSvg`] it eventually stores.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod diagram;
mod error;
mod layout;
pub mod sanitize;
mod svg;

pub use diagram::{ArrowHead, ClickLink, Diagram, Direction, Edge, EdgeKind, Node, NodeShape};
pub use error::{RenderError, SanitizeError};
pub use layout::{Layout, NodeBox};
pub use sanitize::TrustedSvg;
pub use svg::MermaidRenderer;

/// How much interactive content a rendered diagram may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Click directives are ignored
    Strict,
    /// Click directives become links (still subject to the sanitizer's URL rules)
    #[default]
    Loose,
}

/// Renderer configuration, applied once when the renderer is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderConfig {
    pub security_level: SecurityLevel,
}

/// Successful render: the raw SVG plus the parsed diagram it came from
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    pub svg: String,
    pub diagram: Diagram,
}

/// Converts diagram-description text to vector graphics
///
/// `render_id` must be unique per call; it becomes the root element id and
/// prefixes every internal reference so several diagrams can share a page.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, render_id: &str, source: &str) -> Result<RenderedDiagram, RenderError>;
}

/// Create the renderer for one view lifecycle
pub fn create_renderer(config: RenderConfig) -> Arc<dyn DiagramRenderer> {
    debug!(?config, "create_renderer: called");
    Arc::new(MermaidRenderer::new(config))
}

/// Escape text for use in XML content or a double-quoted attribute
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
