//! Integration tests for bookgraph
//!
//! These drive the orchestrator through its public handle with in-process
//! stand-ins for the network clients and the real renderer and sanitizer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookgraph::catalog::{BookSearch, CatalogError, SearchCandidate};
use bookgraph::llm::{GenerateError, GraphGenerator};
use bookgraph::orchestrator::{FailureKind, InteractionState, Orchestrator, OrchestratorConfig, generate_graph};
use bookgraph::render::{RenderConfig, SecurityLevel, create_renderer};
use tokio::sync::watch;

struct ShelfSearch;

#[async_trait]
impl BookSearch for ShelfSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, CatalogError> {
        let shelf = [
            ("The Wonderful Wizard of Oz", "L. Frank Baum"),
            ("Ozma of Oz", "L. Frank Baum"),
            ("Emma", "Jane Austen"),
        ];
        let needle = query.to_lowercase();
        Ok(shelf
            .iter()
            .filter(|(title, _)| title.to_lowercase().contains(&needle))
            .map(|(title, author)| SearchCandidate::new(*title, vec![author.to_string()]))
            .collect())
    }
}

struct ScriptedGenerator;

#[async_trait]
impl GraphGenerator for ScriptedGenerator {
    async fn generate(&self, subject_title: &str) -> Result<String, GenerateError> {
        match subject_title {
            "Emma" => Ok("graph LR\nA[Emma] -->|Friends| B[Harriet]\nA -->|Marries| C[Mr. Knightley]".to_string()),
            "Ozma of Oz" => Ok("Sure! Here is your graph:\ngraph TD\nA --> B".to_string()),
            _ => Ok("graph TD\nA[Dorothy] -->|Pet| B[Toto]\nclick B \"javascript:alert(1)\"".to_string()),
        }
    }
}

fn spawn() -> (bookgraph::OrchestratorHandle, tokio::task::JoinHandle<()>) {
    let config = OrchestratorConfig {
        debounce_ms: 20,
        ..Default::default()
    };
    Orchestrator::spawn(
        config,
        Arc::new(ShelfSearch),
        Arc::new(ScriptedGenerator),
        create_renderer(RenderConfig::default()),
    )
}

async fn wait_for(
    rx: &mut watch::Receiver<InteractionState>,
    f: impl FnMut(&InteractionState) -> bool,
) -> InteractionState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("timed out waiting for state")
        .expect("orchestrator stopped")
        .clone()
}

#[tokio::test]
async fn test_search_then_generate_session() {
    let (handle, task) = spawn();
    let mut rx = handle.subscribe();

    handle.input("oz").await.unwrap();
    handle.input("of oz").await.unwrap();
    let state = wait_for(&mut rx, |s| !s.is_loading && s.candidates.len() == 2).await;
    assert_eq!(state.input_value, "of oz");
    assert_eq!(state.candidates[0].authors_display(), "L. Frank Baum");

    handle.generate("The Wonderful Wizard of Oz").await.unwrap();
    handle.generate("Emma").await.unwrap();
    let state = wait_for(&mut rx, |s| s.generated_graphs.len() == 2).await;
    assert!(state.generating.is_empty());
    assert!(state.last_failure.is_none());

    for graph in &state.generated_graphs {
        assert!(graph.visual.as_str().starts_with("<svg"));
        assert!(!graph.visual.as_str().contains("javascript"));
    }
    let emma = state
        .generated_graphs
        .iter()
        .find(|g| g.subject_title == "Emma")
        .unwrap();
    assert_eq!(emma.node_count, 3);
    assert_eq!(emma.edges[1].to_string(), "Emma --Marries--> Mr. Knightley");

    // Suggestions are untouched by generation
    assert_eq!(state.candidates.len(), 2);

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("orchestrator should stop")
        .unwrap();
}

#[tokio::test]
async fn test_prose_output_is_a_render_failure() {
    let (handle, _task) = spawn();
    let mut rx = handle.subscribe();

    handle.generate("Ozma of Oz").await.unwrap();
    let state = wait_for(&mut rx, |s| s.last_failure.is_some()).await;

    let failure = state.last_failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Render);
    assert_eq!(failure.subject, "Ozma of Oz");
    assert!(state.generated_graphs.is_empty());
    assert!(state.generating.is_empty());
}

#[tokio::test]
async fn test_pipeline_render_ids_are_unique() {
    let renderer = create_renderer(RenderConfig {
        security_level: SecurityLevel::Strict,
    });
    let first = generate_graph(&ScriptedGenerator, renderer.as_ref(), "Emma").await.unwrap();
    let second = generate_graph(&ScriptedGenerator, renderer.as_ref(), "Emma").await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(first.visual.as_str().contains(&format!("graph_{}", first.id.simple())));
    assert_ne!(first.visual, second.visual);
}
