//! OrchestratorHandle - client interface for the view

use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::error::OrchestratorError;
use super::messages::Command;
use super::state::InteractionState;

/// Handle for views to drive the orchestrator
///
/// Cloneable; the orchestrator task stops once every handle is dropped.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<InteractionState>,
}

impl OrchestratorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>, state_rx: watch::Receiver<InteractionState>) -> Self {
        debug!("OrchestratorHandle::new: called");
        Self { tx, state_rx }
    }

    async fn send(&self, command: Command) -> Result<(), OrchestratorError> {
        self.tx.send(command).await.map_err(|_| OrchestratorError::ChannelClosed)
    }

    /// Report a new input value; restarts the debounce window
    pub async fn input(&self, value: impl Into<String>) -> Result<(), OrchestratorError> {
        let value = value.into();
        debug!(%value, "OrchestratorHandle::input: called");
        self.send(Command::Input(value)).await
    }

    /// Clear the input, which clears suggestions without a lookup
    pub async fn clear(&self) -> Result<(), OrchestratorError> {
        debug!("OrchestratorHandle::clear: called");
        self.send(Command::Input(String::new())).await
    }

    /// Request a graph for a confirmed title
    pub async fn generate(&self, title: impl Into<String>) -> Result<(), OrchestratorError> {
        let title = title.into();
        debug!(%title, "OrchestratorHandle::generate: called");
        self.send(Command::Generate(title)).await
    }

    pub async fn dismiss_failure(&self) -> Result<(), OrchestratorError> {
        debug!("OrchestratorHandle::dismiss_failure: called");
        self.send(Command::DismissFailure).await
    }

    /// Stop the orchestrator, aborting in-flight work
    pub async fn shutdown(&self) -> Result<(), OrchestratorError> {
        debug!("OrchestratorHandle::shutdown: called");
        self.send(Command::Shutdown).await
    }

    /// Receiver that is notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<InteractionState> {
        debug!("OrchestratorHandle::subscribe: called");
        self.state_rx.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> InteractionState {
        self.state_rx.borrow().clone()
    }
}
