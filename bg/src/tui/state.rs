//! TUI application state
//!
//! Pure data structures for the TUI. No rendering logic here. The
//! orchestrator snapshot is mirrored in; everything else is local view state.

use crate::catalog::SearchCandidate;
use crate::orchestrator::{GeneratedGraph, InputValidation, InteractionState};

/// Which section receives keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Graphs,
}

/// Selection state for lists
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub selected_index: usize,
}

impl SelectionState {
    pub fn select_next(&mut self, max_items: usize) {
        if max_items > 0 && self.selected_index < max_items - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Ensure selection is within bounds
    pub fn clamp(&mut self, max_items: usize) {
        if max_items == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= max_items {
            self.selected_index = max_items - 1;
        }
    }
}

/// Main TUI application state
#[derive(Debug)]
pub struct AppState {
    /// Latest orchestrator snapshot
    pub snapshot: InteractionState,
    /// Input text as typed; sent to the orchestrator on every edit
    pub input: String,
    /// Set on the first edit so validation errors are not shown on an untouched field
    pub touched: bool,
    pub min_query_len: usize,
    pub focus: Focus,
    pub suggestions: SelectionState,
    pub graphs: SelectionState,
    /// Index into `generated_graphs` of the open dialog
    pub dialog: Option<usize>,
    /// Lines scrolled past at the top of the open dialog
    pub dialog_scroll: u16,
    pub should_quit: bool,
    /// Frame counter for the loading spinner
    pub ticks: u64,
}

impl AppState {
    pub fn new(min_query_len: usize) -> Self {
        Self {
            snapshot: InteractionState::default(),
            input: String::new(),
            touched: false,
            min_query_len,
            focus: Focus::default(),
            suggestions: SelectionState::default(),
            graphs: SelectionState::default(),
            dialog: None,
            dialog_scroll: 0,
            should_quit: false,
            ticks: 0,
        }
    }

    /// Take a new snapshot, keeping selections and the dialog in range
    pub fn apply_snapshot(&mut self, snapshot: InteractionState) {
        if snapshot.candidates != self.snapshot.candidates {
            self.suggestions.select_first();
        }
        self.snapshot = snapshot;
        self.suggestions.clamp(self.snapshot.candidates.len());
        self.graphs.clamp(self.snapshot.generated_graphs.len());
        if self.dialog.is_some_and(|i| i >= self.snapshot.generated_graphs.len()) {
            self.close_dialog();
        }
    }

    pub fn open_dialog(&mut self, index: usize) {
        self.dialog = Some(index);
        self.dialog_scroll = 0;
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
        self.dialog_scroll = 0;
    }

    pub fn scroll_dialog_down(&mut self) {
        self.dialog_scroll = self.dialog_scroll.saturating_add(1);
    }

    pub fn scroll_dialog_up(&mut self) {
        self.dialog_scroll = self.dialog_scroll.saturating_sub(1);
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    pub fn validation(&self) -> InputValidation {
        InputValidation::validate(&self.input, self.min_query_len)
    }

    /// Validation error to show under the input, if any
    pub fn validation_message(&self) -> Option<String> {
        if self.touched {
            self.validation().message()
        } else {
            None
        }
    }

    /// Generate is enabled for valid input with at least one suggestion
    pub fn can_generate(&self) -> bool {
        self.validation().is_valid() && !self.snapshot.candidates.is_empty()
    }

    pub fn highlighted_candidate(&self) -> Option<&SearchCandidate> {
        self.snapshot.candidates.get(self.suggestions.selected_index)
    }

    pub fn selected_graph(&self) -> Option<&GeneratedGraph> {
        self.snapshot.generated_graphs.get(self.graphs.selected_index)
    }

    pub fn dialog_graph(&self) -> Option<&GeneratedGraph> {
        self.dialog.and_then(|i| self.snapshot.generated_graphs.get(i))
    }
}
