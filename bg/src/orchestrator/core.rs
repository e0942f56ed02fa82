//! Main orchestrator task implementation

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::config::OrchestratorConfig;
use super::error::PipelineError;
use super::handle::OrchestratorHandle;
use super::messages::{Command, SearchCompletion};
use super::pipeline::generate_graph;
use super::state::{Failure, FailureKind, GeneratedGraph, InputValidation, InteractionState};
use crate::catalog::BookSearch;
use crate::llm::GraphGenerator;
use crate::render::DiagramRenderer;

type GenerationOutcome = (String, Result<GeneratedGraph, PipelineError>);

/// Owns the interaction state and sequences the book lookup, generation and
/// rendering collaborators
pub struct Orchestrator {
    config: OrchestratorConfig,
    search: Arc<dyn BookSearch>,
    generator: Arc<dyn GraphGenerator>,
    renderer: Arc<dyn DiagramRenderer>,

    rx: mpsc::Receiver<Command>,
    state: InteractionState,
    state_tx: watch::Sender<InteractionState>,

    /// When the pending debounce fires, if any
    deadline: Option<Instant>,
    /// Sequence number of the latest dispatched search
    search_seq: u64,
    search_task: Option<JoinHandle<()>>,
    search_tx: mpsc::UnboundedSender<SearchCompletion>,
    search_rx: mpsc::UnboundedReceiver<SearchCompletion>,

    generations: JoinSet<GenerationOutcome>,
}

impl Orchestrator {
    /// Spawn the orchestrator task
    ///
    /// Returns the handle views talk to and the task's JoinHandle, which
    /// completes after shutdown or once every handle is dropped.
    pub fn spawn(
        config: OrchestratorConfig,
        search: Arc<dyn BookSearch>,
        generator: Arc<dyn GraphGenerator>,
        renderer: Arc<dyn DiagramRenderer>,
    ) -> (OrchestratorHandle, JoinHandle<()>) {
        debug!(?config, "Orchestrator::spawn: called");
        let (orchestrator, handle) = Self::new(config, search, generator, renderer);
        let task = tokio::spawn(orchestrator.run());
        info!("Orchestrator spawned");
        (handle, task)
    }

    fn new(
        config: OrchestratorConfig,
        search: Arc<dyn BookSearch>,
        generator: Arc<dyn GraphGenerator>,
        renderer: Arc<dyn DiagramRenderer>,
    ) -> (Self, OrchestratorHandle) {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let (state_tx, state_rx) = watch::channel(InteractionState::default());
        let (search_tx, search_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            config,
            search,
            generator,
            renderer,
            rx,
            state: InteractionState::default(),
            state_tx,
            deadline: None,
            search_seq: 0,
            search_task: None,
            search_tx,
            search_rx,
            generations: JoinSet::new(),
        };
        (orchestrator, OrchestratorHandle::new(tx, state_rx))
    }

    /// Run until shutdown is requested or every handle is gone
    async fn run(mut self) {
        debug!("run: called");
        loop {
            let deadline = self.deadline;
            tokio::select! {
                command = self.rx.recv() => {
                    let Some(command) = command else {
                        debug!("run: all handles dropped");
                        break;
                    };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }

                Some(completion) = self.search_rx.recv() => self.apply_search(completion),

                Some(joined) = self.generations.join_next(), if !self.generations.is_empty() => {
                    self.apply_generation(joined);
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    self.dispatch_search();
                }
            }
        }

        self.teardown();
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(?command, "handle_command: called");
        match command {
            Command::Input(value) => {
                self.state.input_value = value;
                self.deadline = Some(Instant::now() + self.config.debounce());
                self.publish();
            }
            Command::Generate(title) => self.start_generation(title),
            Command::DismissFailure => {
                if self.state.last_failure.take().is_some() {
                    self.publish();
                }
            }
            Command::Shutdown => {
                debug!("handle_command: shutdown requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Debounce expired: start a lookup for the current input, superseding any earlier one
    fn dispatch_search(&mut self) {
        self.search_seq += 1;
        if let Some(task) = self.search_task.take() {
            debug!(seq = self.search_seq, "dispatch_search: aborting superseded search");
            task.abort();
        }

        let query = self.state.input_value.clone();
        self.state.candidates.clear();

        if InputValidation::validate(&query, self.config.min_query_len).is_valid() {
            debug!(seq = self.search_seq, %query, "dispatch_search: dispatching");
            self.state.is_loading = true;

            let search = Arc::clone(&self.search);
            let tx = self.search_tx.clone();
            let seq = self.search_seq;
            self.search_task = Some(tokio::spawn(async move {
                let result = search.search(&query).await;
                let _ = tx.send(SearchCompletion { seq, query, result });
            }));
        } else {
            debug!(seq = self.search_seq, %query, "dispatch_search: input not searchable, skipping lookup");
            self.state.is_loading = false;
        }

        self.publish();
    }

    fn apply_search(&mut self, completion: SearchCompletion) {
        let SearchCompletion { seq, query, result } = completion;
        if seq != self.search_seq {
            debug!(seq, latest = self.search_seq, "apply_search: stale result ignored");
            return;
        }

        self.search_task = None;
        self.state.is_loading = false;
        match result {
            Ok(candidates) => {
                debug!(seq, count = candidates.len(), "apply_search: candidates received");
                self.state.candidates = candidates;
            }
            Err(e) => {
                warn!(%query, error = %e, "Book search failed");
                self.state.candidates.clear();
                self.state.last_failure = Some(Failure::new(FailureKind::Search, query, e.to_string()));
            }
        }
        self.publish();
    }

    fn start_generation(&mut self, title: String) {
        let title = title.trim().to_string();
        if title.is_empty() {
            debug!("start_generation: empty title rejected");
            return;
        }

        let generator = Arc::clone(&self.generator);
        let renderer = Arc::clone(&self.renderer);
        let subject = title.clone();
        self.generations.spawn(async move {
            let outcome = generate_graph(generator.as_ref(), renderer.as_ref(), &subject).await;
            (subject, outcome)
        });
        debug!(%title, in_flight = self.generations.len(), "start_generation: spawned");

        self.state.generating.push(title);
        self.publish();
    }

    fn apply_generation(&mut self, joined: Result<GenerationOutcome, JoinError>) {
        let (title, outcome) = match joined {
            Ok(finished) => finished,
            Err(e) => {
                // Only a panic gets here; aborts happen at teardown after the loop exits
                warn!(error = %e, "Graph generation task panicked");
                return;
            }
        };
        if let Some(pos) = self.state.generating.iter().position(|t| *t == title) {
            self.state.generating.remove(pos);
        }

        match outcome {
            Ok(graph) => {
                debug!(%title, graph_id = %graph.id, "apply_generation: appending graph");
                self.state.generated_graphs.push(graph);
            }
            Err(e) => {
                warn!(%title, error = %e, "Graph generation failed");
                self.state.last_failure = Some(Failure::new(e.kind(), title, e.to_string()));
            }
        }
        self.publish();
    }

    /// Discard pending work and publish the final snapshot
    fn teardown(&mut self) {
        debug!("teardown: called");
        self.deadline = None;
        if let Some(task) = self.search_task.take() {
            task.abort();
        }
        let aborted = self.generations.len();
        self.generations.abort_all();

        self.state.is_loading = false;
        self.state.generating.clear();
        self.publish();
        info!(aborted_generations = aborted, "Orchestrator stopped");
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::client::mock::MockBookSearch;
    use crate::catalog::{CatalogError, SearchCandidate};
    use crate::llm::client::mock::MockGraphGenerator;
    use crate::render::{RenderConfig, create_renderer};
    use std::time::Duration;

    const MS: Duration = Duration::from_millis(1);

    struct Harness {
        handle: OrchestratorHandle,
        task: JoinHandle<()>,
        search: Arc<MockBookSearch>,
        generator: Arc<MockGraphGenerator>,
    }

    fn start(search: MockBookSearch, generator: MockGraphGenerator) -> Harness {
        let search = Arc::new(search);
        let generator = Arc::new(generator);
        let (handle, task) = Orchestrator::spawn(
            OrchestratorConfig::default(),
            search.clone(),
            generator.clone(),
            create_renderer(RenderConfig::default()),
        );
        Harness {
            handle,
            task,
            search,
            generator,
        }
    }

    /// Wait (in virtual time) for a snapshot matching `pred`
    async fn wait_for(handle: &OrchestratorHandle, pred: impl FnMut(&InteractionState) -> bool) -> InteractionState {
        let mut rx = handle.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
            .await
            .expect("timed out waiting for state")
            .expect("orchestrator stopped")
            .clone();
        state
    }

    fn titles(state: &InteractionState) -> Vec<String> {
        state.candidates.iter().map(|c| c.title.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_or_empty_input_never_searches() {
        let h = start(MockBookSearch::new(), MockGraphGenerator::new());

        for value in ["", "   ", "o", "oz", "the"] {
            h.handle.input(value).await.unwrap();
            tokio::time::sleep(1000 * MS).await;
            let state = h.handle.snapshot();
            assert!(state.candidates.is_empty());
            assert!(!state.is_loading);
        }
        assert_eq!(h.search.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_one_search_with_final_value() {
        let search = MockBookSearch::new().with_books("the hobbit", 50 * MS, &["The Hobbit"]);
        let h = start(search, MockGraphGenerator::new());

        let mut typed = String::new();
        for ch in "the hobbit".chars() {
            typed.push(ch);
            h.handle.input(typed.clone()).await.unwrap();
            tokio::time::sleep(100 * MS).await;
        }
        assert_eq!(h.search.call_count(), 0);

        let state = wait_for(&h.handle, |s| !s.candidates.is_empty()).await;
        assert_eq!(titles(&state), vec!["The Hobbit"]);
        assert_eq!(h.search.calls(), vec!["the hobbit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_window() {
        let h = start(MockBookSearch::new(), MockGraphGenerator::new());

        h.handle.input("dune").await.unwrap();
        tokio::time::sleep(399 * MS).await;
        assert_eq!(h.search.call_count(), 0);

        tokio::time::sleep(2 * MS).await;
        assert_eq!(h.search.calls(), vec!["dune"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_between_dispatch_and_result() {
        let search = MockBookSearch::new().with_books("dune", 200 * MS, &["Dune"]);
        let h = start(search, MockGraphGenerator::new());

        h.handle.input("dune").await.unwrap();
        let loading = wait_for(&h.handle, |s| s.is_loading).await;
        assert!(loading.candidates.is_empty());

        let done = wait_for(&h.handle, |s| !s.is_loading).await;
        assert_eq!(titles(&done), vec!["Dune"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_search_wins() {
        let search = MockBookSearch::new()
            .with_books("fooo", 500 * MS, &["Fooo A"])
            .with_books("foobar", 50 * MS, &["Foobar B"]);
        let h = start(search, MockGraphGenerator::new());

        // first lookup dispatched at 400ms and still in flight when the second is typed
        h.handle.input("fooo").await.unwrap();
        tokio::time::sleep(450 * MS).await;
        assert_eq!(h.search.call_count(), 1);
        h.handle.input("foobar").await.unwrap();

        tokio::time::sleep(3000 * MS).await;
        let state = h.handle.snapshot();
        assert_eq!(titles(&state), vec!["Foobar B"]);
        assert!(!state.is_loading);
        assert_eq!(h.search.calls(), vec!["fooo", "foobar"]);
        // the superseded lookup was cancelled
        assert_eq!(h.search.completed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_search_completion_is_ignored() {
        let search = MockBookSearch::new()
            .with_books("dune", 50 * MS, &["Dune"])
            .with_books("dune messiah", 0 * MS, &["Dune Messiah"]);
        let (mut orchestrator, handle) = Orchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(search),
            Arc::new(MockGraphGenerator::new()),
            create_renderer(RenderConfig::default()),
        );

        orchestrator.state.input_value = "dune".to_string();
        orchestrator.dispatch_search();
        let stale_seq = orchestrator.search_seq;
        orchestrator.state.input_value = "dune messiah".to_string();
        orchestrator.dispatch_search();

        let fresh = orchestrator.search_rx.recv().await.unwrap();
        assert_ne!(fresh.seq, stale_seq);
        orchestrator.apply_search(fresh);
        let settled = handle.snapshot();
        assert_eq!(titles(&settled), vec!["Dune Messiah"]);
        assert!(!settled.is_loading);

        // a superseded lookup that still reports back changes nothing
        let late = [
            Ok(vec![SearchCandidate::new("Dune", vec![])]),
            Err(CatalogError::InvalidResponse("offline".to_string())),
        ];
        for result in late {
            orchestrator
                .search_tx
                .send(SearchCompletion {
                    seq: stale_seq,
                    query: "dune".to_string(),
                    result,
                })
                .unwrap();
            let completion = orchestrator.search_rx.recv().await.unwrap();
            orchestrator.apply_search(completion);

            assert_eq!(orchestrator.state, settled);
            assert_eq!(handle.snapshot(), settled);
            assert!(orchestrator.state.last_failure.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failure_resets_loading() {
        let search = MockBookSearch::new().with_failure("dune", 100 * MS, "service unavailable");
        let h = start(search, MockGraphGenerator::new());

        h.handle.input("dune").await.unwrap();
        let state = wait_for(&h.handle, |s| s.last_failure.is_some()).await;
        assert!(!state.is_loading);
        assert!(state.candidates.is_empty());

        let failure = state.last_failure.unwrap();
        assert_eq!(failure.kind, FailureKind::Search);
        assert_eq!(failure.subject, "dune");
        assert!(failure.message.contains("service unavailable"));

        h.handle.dismiss_failure().await.unwrap();
        wait_for(&h.handle, |s| s.last_failure.is_none()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_candidates_without_search() {
        let search = MockBookSearch::new().with_books("dune", 10 * MS, &["Dune", "Dune Messiah"]);
        let h = start(search, MockGraphGenerator::new());

        h.handle.input("dune").await.unwrap();
        wait_for(&h.handle, |s| s.candidates.len() == 2).await;

        h.handle.clear().await.unwrap();
        let state = wait_for(&h.handle, |s| s.candidates.is_empty()).await;
        assert_eq!(state.input_value, "");
        tokio::time::sleep(1000 * MS).await;
        assert_eq!(h.search.call_count(), 1);
        assert!(h.handle.snapshot().candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_appends_graph() {
        let generator = MockGraphGenerator::new().with_text("Dune", 100 * MS, "graph TD\nA-->B");
        let h = start(MockBookSearch::new(), generator);

        h.handle.generate("Dune").await.unwrap();
        let running = wait_for(&h.handle, |s| !s.generating.is_empty()).await;
        assert_eq!(running.generating, vec!["Dune"]);

        let state = wait_for(&h.handle, |s| !s.generated_graphs.is_empty()).await;
        assert_eq!(state.generated_graphs.len(), 1);
        let graph = &state.generated_graphs[0];
        assert_eq!(graph.subject_title, "Dune");
        assert!(!graph.visual.is_empty());
        assert!(graph.visual.as_str().starts_with("<svg"));
        assert_eq!((graph.node_count, graph.edge_count), (2, 1));
        assert!(state.generating.is_empty());
        assert!(!state.is_loading);
        assert!(state.last_failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generations_append_in_completion_order() {
        let generator = MockGraphGenerator::new()
            .with_text("First", 300 * MS, "graph TD\nA-->B")
            .with_text("Second", 100 * MS, "graph LR\nC-->D");
        let h = start(MockBookSearch::new(), generator);

        h.handle.generate("First").await.unwrap();
        h.handle.generate("Second").await.unwrap();

        let state = wait_for(&h.handle, |s| s.generated_graphs.len() == 2).await;
        let order: Vec<&str> = state.generated_graphs.iter().map(|g| g.subject_title.as_str()).collect();
        assert_eq!(order, vec!["Second", "First"]);
        assert_ne!(state.generated_graphs[0].id, state.generated_graphs[1].id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_diagram_appends_nothing() {
        let generator = MockGraphGenerator::new()
            .with_text("Dune", 10 * MS, "graph TD\nA-->B")
            .with_text("Emma", 10 * MS, "Here is the character graph:\n```mermaid\ngraph TD\nA-->B\n```");
        let h = start(MockBookSearch::new(), generator);

        h.handle.generate("Dune").await.unwrap();
        let before = wait_for(&h.handle, |s| s.generated_graphs.len() == 1).await;

        h.handle.generate("Emma").await.unwrap();
        let state = wait_for(&h.handle, |s| s.last_failure.is_some()).await;
        assert_eq!(state.generated_graphs, before.generated_graphs);
        assert!(state.generating.is_empty());

        let failure = state.last_failure.unwrap();
        assert_eq!(failure.kind, FailureKind::Render);
        assert_eq!(failure.subject, "Emma");
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_backend_failure() {
        let generator = MockGraphGenerator::new().with_failure("Dune", 10 * MS, "model not loaded");
        let h = start(MockBookSearch::new(), generator);

        h.handle.generate("Dune").await.unwrap();
        let state = wait_for(&h.handle, |s| s.last_failure.is_some()).await;
        assert!(state.generated_graphs.is_empty());
        assert_eq!(state.last_failure.unwrap().kind, FailureKind::Generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_does_not_touch_search_state() {
        let search = MockBookSearch::new().with_books("dune", 10 * MS, &["Dune"]);
        let generator = MockGraphGenerator::new().with_text("Dune", 10 * MS, "graph TD\nA-->B");
        let h = start(search, generator);

        h.handle.input("dune").await.unwrap();
        wait_for(&h.handle, |s| !s.candidates.is_empty()).await;

        h.handle.generate("Dune").await.unwrap();
        let state = wait_for(&h.handle, |s| !s.generated_graphs.is_empty()).await;
        assert_eq!(titles(&state), vec!["Dune"]);
        assert!(!state.is_loading);
        assert_eq!(h.search.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_title_rejected_locally() {
        let h = start(MockBookSearch::new(), MockGraphGenerator::new());

        h.handle.generate("   ").await.unwrap();
        tokio::time::sleep(1000 * MS).await;
        assert!(h.generator.calls().is_empty());
        assert!(h.handle.snapshot().generating.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_in_flight_work() {
        let search = MockBookSearch::new().with_books("dune", 10_000 * MS, &["Dune"]);
        let generator = MockGraphGenerator::new().with_text("Dune", 10_000 * MS, "graph TD\nA-->B");
        let h = start(search, generator);

        h.handle.input("dune").await.unwrap();
        h.handle.generate("Dune").await.unwrap();
        wait_for(&h.handle, |s| s.is_loading && !s.generating.is_empty()).await;

        h.handle.shutdown().await.unwrap();
        h.task.await.unwrap();

        let last = h.handle.snapshot();
        assert!(!last.is_loading);
        assert!(last.generating.is_empty());

        tokio::time::sleep(20_000 * MS).await;
        assert_eq!(h.search.completed(), 0);
        assert_eq!(h.generator.completed(), 0);
        assert!(h.handle.input("more").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_task() {
        let h = start(MockBookSearch::new(), MockGraphGenerator::new());
        let Harness { handle, task, .. } = h;

        let clone = handle.clone();
        drop(handle);
        clone.input("dune").await.unwrap();
        drop(clone);

        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
