//! Terminal User Interface for bookgraph
//!
//! Provides:
//! - A title input with validation and debounced autocomplete
//! - Graph cards for every generated character graph
//! - A dialog listing the relationships of a selected graph

mod app;
mod events;
mod runner;
pub mod state;
mod views;

pub use app::{Action, App};
pub use events::{Event, EventHandler};
pub use runner::TuiRunner;
pub use state::{AppState, Focus};

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use eyre::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::orchestrator::OrchestratorHandle;

/// Terminal type alias
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the TUI against a running orchestrator
pub async fn run(handle: OrchestratorHandle, min_query_len: usize) -> Result<()> {
    let terminal = init()?;

    // Use a guard to ensure terminal is restored even on early return/error
    struct TerminalGuard;
    impl Drop for TerminalGuard {
        fn drop(&mut self) {
            let _ = restore();
        }
    }
    let _guard = TerminalGuard;

    let mut runner = TuiRunner::new(terminal, handle, min_query_len);
    runner.run().await
}
