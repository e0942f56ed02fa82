//! TUI Runner - main loop that owns the terminal and follows the orchestrator
//!
//! The TuiRunner is responsible for:
//! - Drawing the current AppState
//! - Dispatching key events to App and forwarding its actions to the orchestrator
//! - Mirroring every published InteractionState snapshot into the AppState

use std::time::Duration;

use eyre::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::orchestrator::{InteractionState, OrchestratorHandle};

use super::Tui;
use super::app::{Action, App};
use super::events::{Event, EventHandler};
use super::views;

/// Spinner frame rate when idle
const TICK_RATE: Duration = Duration::from_millis(100);

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    handle: OrchestratorHandle,
    state_rx: watch::Receiver<InteractionState>,
    event_handler: EventHandler,
}

impl TuiRunner {
    pub fn new(terminal: Tui, handle: OrchestratorHandle, min_query_len: usize) -> Self {
        debug!(min_query_len, "TuiRunner::new: called");
        let state_rx = handle.subscribe();
        Self {
            app: App::new(min_query_len),
            terminal,
            handle,
            state_rx,
            event_handler: EventHandler::new(TICK_RATE),
        }
    }

    /// Run the TUI main loop until the user quits or the orchestrator stops
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: called");
        let initial = self.state_rx.borrow_and_update().clone();
        self.app.state_mut().apply_snapshot(initial);

        loop {
            self.terminal.draw(|frame| views::render(self.app.state(), frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Key(key) => {
                            if let Some(action) = self.app.handle_key(key)
                                && self.dispatch(action).await?
                            {
                                break;
                            }
                        }
                        Event::Tick => self.app.state_mut().tick(),
                        Event::Resize(width, height) => debug!(width, height, "TuiRunner::run: resize"),
                    }
                }
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        warn!("Orchestrator stopped, leaving TUI");
                        break;
                    }
                    let snapshot = self.state_rx.borrow_and_update().clone();
                    self.app.state_mut().apply_snapshot(snapshot);
                }
            }

            if self.app.state().should_quit {
                break;
            }
        }

        if let Err(e) = self.handle.shutdown().await {
            debug!(error = %e, "TuiRunner::run: orchestrator already stopped");
        }
        info!("TUI exited");
        Ok(())
    }

    /// Forward an action to the orchestrator; returns true when the TUI should exit
    async fn dispatch(&mut self, action: Action) -> Result<bool> {
        debug!(?action, "TuiRunner::dispatch: called");
        match action {
            Action::Input(value) => self.handle.input(value).await?,
            Action::Clear => self.handle.clear().await?,
            Action::Generate(title) => self.handle.generate(title).await?,
            Action::DismissFailure => self.handle.dismiss_failure().await?,
            Action::Quit => return Ok(true),
        }
        Ok(false)
    }
}
