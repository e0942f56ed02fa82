//! TUI application - key handling
//!
//! The App owns the AppState and turns key events into local state changes
//! and [`Action`]s for the runner to forward to the orchestrator. It does no
//! rendering and no I/O.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use super::state::{AppState, Focus};

/// Work for the runner after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The input changed
    Input(String),
    /// The input was emptied
    Clear,
    Generate(String),
    DismissFailure,
    Quit,
}

/// TUI application
#[derive(Debug)]
pub struct App {
    state: AppState,
}

impl App {
    pub fn new(min_query_len: usize) -> Self {
        Self {
            state: AppState::new(min_query_len),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        debug!(?key.code, ?key.modifiers, "handle_key: called");

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state.should_quit = true;
            return Some(Action::Quit);
        }

        // Any key dismisses the failure banner and is otherwise ignored
        if self.state.snapshot.last_failure.take().is_some() {
            return Some(Action::DismissFailure);
        }

        if self.state.dialog.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.state.close_dialog(),
                KeyCode::Up | KeyCode::Char('k') => self.state.scroll_dialog_up(),
                KeyCode::Down | KeyCode::Char('j') => self.state.scroll_dialog_down(),
                KeyCode::Home => self.state.dialog_scroll = 0,
                _ => {}
            }
            return None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('n') => self.state.focus = Focus::Graphs,
                KeyCode::Char('b') => self.state.focus = Focus::Input,
                KeyCode::Char('u') if self.state.focus == Focus::Input => return self.clear_input(),
                _ => {}
            }
            return None;
        }

        if key.code == KeyCode::Esc {
            self.state.should_quit = true;
            return Some(Action::Quit);
        }

        match self.state.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Graphs => self.handle_graphs_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char(c) => {
                self.state.input.push(c);
                self.input_changed()
            }
            KeyCode::Backspace => {
                if self.state.input.pop().is_some() {
                    self.input_changed()
                } else {
                    None
                }
            }
            KeyCode::Up => {
                self.state.suggestions.select_prev();
                None
            }
            KeyCode::Down => {
                let max = self.state.snapshot.candidates.len();
                self.state.suggestions.select_next(max);
                None
            }
            KeyCode::Tab => {
                let title = self.state.highlighted_candidate()?.title.clone();
                self.state.input = title;
                self.input_changed()
            }
            KeyCode::Enter => {
                if !self.state.can_generate() {
                    debug!("handle_input_key: generate not available");
                    return None;
                }
                Some(Action::Generate(self.state.input.trim().to_string()))
            }
            _ => None,
        }
    }

    fn handle_graphs_key(&mut self, key: KeyEvent) -> Option<Action> {
        let count = self.state.snapshot.generated_graphs.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.state.graphs.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.state.graphs.select_next(count),
            KeyCode::Enter if count > 0 => self.state.open_dialog(self.state.graphs.selected_index),
            _ => {}
        }
        None
    }

    fn input_changed(&mut self) -> Option<Action> {
        self.state.touched = true;
        if self.state.input.is_empty() {
            Some(Action::Clear)
        } else {
            Some(Action::Input(self.state.input.clone()))
        }
    }

    fn clear_input(&mut self) -> Option<Action> {
        self.state.input.clear();
        self.state.touched = true;
        Some(Action::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SearchCandidate;
    use crate::orchestrator::{Failure, FailureKind, GeneratedGraph, InteractionState};
    use crate::render::{Diagram, TrustedSvg};
    use uuid::Uuid;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) -> Option<Action> {
        let mut last = None;
        for c in text.chars() {
            last = app.handle_key(key(KeyCode::Char(c)));
        }
        last
    }

    fn graph(title: &str) -> GeneratedGraph {
        let source = "graph TD\nA[Paul] -->|Mother| B[Jessica]";
        let diagram = Diagram::parse(source).unwrap();
        let visual = TrustedSvg::sanitize("<svg></svg>").unwrap();
        GeneratedGraph::new(Uuid::now_v7(), title, source.to_string(), &diagram, visual)
    }

    fn with_candidates(app: &mut App, titles: &[&str]) {
        let snapshot = InteractionState {
            candidates: titles.iter().map(|t| SearchCandidate::new(*t, vec![])).collect(),
            ..app.state().snapshot.clone()
        };
        app.state_mut().apply_snapshot(snapshot);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new(4);
        assert_eq!(app.handle_key(ctrl('c')), Some(Action::Quit));

        let mut app = App::new(4);
        assert_eq!(app.handle_key(key(KeyCode::Esc)), Some(Action::Quit));
        assert!(app.state().should_quit);
    }

    #[test]
    fn test_typing_sends_input() {
        let mut app = App::new(4);
        assert_eq!(type_text(&mut app, "dune"), Some(Action::Input("dune".to_string())));
        assert!(app.state().touched);

        assert_eq!(app.handle_key(key(KeyCode::Backspace)), Some(Action::Input("dun".to_string())));
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Backspace));
        }
        assert_eq!(app.state().input, "");
        assert_eq!(app.handle_key(key(KeyCode::Backspace)), None);
    }

    #[test]
    fn test_erasing_everything_clears() {
        let mut app = App::new(4);
        type_text(&mut app, "o");
        assert_eq!(app.handle_key(key(KeyCode::Backspace)), Some(Action::Clear));

        type_text(&mut app, "dune");
        assert_eq!(app.handle_key(ctrl('u')), Some(Action::Clear));
        assert_eq!(app.state().input, "");
    }

    #[test]
    fn test_tab_accepts_highlighted_suggestion() {
        let mut app = App::new(4);
        type_text(&mut app, "dune");
        with_candidates(&mut app, &["Dune", "Dune Messiah"]);

        app.handle_key(key(KeyCode::Down));
        assert_eq!(
            app.handle_key(key(KeyCode::Tab)),
            Some(Action::Input("Dune Messiah".to_string()))
        );
        assert_eq!(app.state().input, "Dune Messiah");
    }

    #[test]
    fn test_tab_without_suggestions_does_nothing() {
        let mut app = App::new(4);
        type_text(&mut app, "dune");
        assert_eq!(app.handle_key(key(KeyCode::Tab)), None);
    }

    #[test]
    fn test_enter_generates_only_when_enabled() {
        let mut app = App::new(4);
        type_text(&mut app, "dune ");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);

        with_candidates(&mut app, &["Dune"]);
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Some(Action::Generate("dune".to_string())));
    }

    #[test]
    fn test_failure_banner_swallows_one_key() {
        let mut app = App::new(4);
        let snapshot = InteractionState {
            last_failure: Some(Failure::new(FailureKind::Search, "dune", "offline")),
            ..Default::default()
        };
        app.state_mut().apply_snapshot(snapshot);

        assert_eq!(app.handle_key(key(KeyCode::Char('x'))), Some(Action::DismissFailure));
        assert_eq!(app.state().input, "");
        assert_eq!(type_text(&mut app, "x"), Some(Action::Input("x".to_string())));
    }

    #[test]
    fn test_focus_switch_and_dialog() {
        let mut app = App::new(4);
        let snapshot = InteractionState {
            generated_graphs: vec![graph("Dune"), graph("Emma")],
            ..Default::default()
        };
        app.state_mut().apply_snapshot(snapshot);

        app.handle_key(ctrl('n'));
        assert_eq!(app.state().focus, Focus::Graphs);

        // letters do not reach the input while the graphs have focus
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.state().input, "");
        assert_eq!(app.state().selected_graph().unwrap().subject_title, "Emma");

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.state().dialog_graph().unwrap().subject_title, "Emma");

        // Esc closes the dialog instead of quitting
        assert_eq!(app.handle_key(key(KeyCode::Esc)), None);
        assert!(app.state().dialog.is_none());
        assert!(!app.state().should_quit);

        app.handle_key(ctrl('b'));
        assert_eq!(app.state().focus, Focus::Input);
    }

    #[test]
    fn test_dialog_scrolls_and_resets() {
        let mut app = App::new(4);
        let snapshot = InteractionState {
            generated_graphs: vec![graph("Dune")],
            ..Default::default()
        };
        app.state_mut().apply_snapshot(snapshot);
        app.handle_key(ctrl('n'));
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.state().dialog_scroll, 0);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.state().dialog_scroll, 3);
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.state().dialog_scroll, 2);

        // scrolling moves the dialog text, not the graph selection
        assert_eq!(app.state().graphs.selected_index, 0);
        assert_eq!(app.state().input, "");

        app.handle_key(key(KeyCode::Esc));
        assert!(app.state().dialog.is_none());
        assert_eq!(app.state().dialog_scroll, 0);

        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Home));
        assert_eq!(app.state().dialog_scroll, 0);
    }

    #[test]
    fn test_enter_on_empty_graphs_opens_nothing() {
        let mut app = App::new(4);
        app.handle_key(ctrl('n'));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.state().dialog.is_none());
    }
}
