//! Generate, render and sanitize one graph

use tracing::{debug, info};
use uuid::Uuid;

use super::error::PipelineError;
use super::state::GeneratedGraph;
use crate::llm::GraphGenerator;
use crate::render::{DiagramRenderer, TrustedSvg};

/// Run one full generation cycle for `subject_title`
///
/// Each call renders under a fresh `graph_<uuid>` id so several diagrams can
/// share a page without their internal references colliding.
pub async fn generate_graph(
    generator: &dyn GraphGenerator,
    renderer: &dyn DiagramRenderer,
    subject_title: &str,
) -> Result<GeneratedGraph, PipelineError> {
    debug!(%subject_title, "generate_graph: called");
    let id = Uuid::now_v7();
    let render_id = format!("graph_{}", id.simple());

    let source = generator.generate(subject_title).await?;
    debug!(%subject_title, source_len = source.len(), "generate_graph: diagram text received");

    let rendered = renderer.render(&render_id, &source).await?;
    let visual = TrustedSvg::sanitize(&rendered.svg)?;

    let graph = GeneratedGraph::new(id, subject_title, source, &rendered.diagram, visual);
    info!(
        %subject_title,
        nodes = graph.node_count,
        edges = graph.edge_count,
        "Generated graph"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockGraphGenerator;
    use crate::render::{RenderConfig, RenderError, create_renderer};
    use std::time::Duration;

    #[tokio::test]
    async fn test_generate_graph_success() {
        let generator = MockGraphGenerator::new().with_text("Dune", Duration::ZERO, "graph TD\nA[Paul] -->|Mother| B[Jessica]");
        let renderer = create_renderer(RenderConfig::default());

        let graph = generate_graph(&generator, renderer.as_ref(), "Dune").await.unwrap();
        assert_eq!(graph.subject_title, "Dune");
        assert_eq!(graph.node_count, 2);
        assert_eq!(graph.edges[0].to_string(), "Paul --Mother--> Jessica");
        assert!(graph.visual.as_str().contains(&format!("id=\"graph_{}\"", graph.id.simple())));
    }

    #[tokio::test]
    async fn test_generate_graph_render_failure() {
        let generator = MockGraphGenerator::new().with_text("Dune", Duration::ZERO, "Sure! Here is the graph you asked for.");
        let renderer = create_renderer(RenderConfig::default());

        let err = generate_graph(&generator, renderer.as_ref(), "Dune").await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(RenderError::Syntax { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_generate_graph_backend_failure() {
        let generator = MockGraphGenerator::new().with_failure("Dune", Duration::ZERO, "connection refused");
        let renderer = create_renderer(RenderConfig::default());

        let err = generate_graph(&generator, renderer.as_ref(), "Dune").await.unwrap_err();
        assert!(matches!(err, PipelineError::Generate(_)));
    }
}
