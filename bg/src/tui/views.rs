//! TUI views and rendering

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use super::state::{AppState, Focus};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Input + validation
            Constraint::Min(5),    // Suggestions
            Constraint::Min(6),    // Graph cards
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(state, frame, chunks[0]);
    render_input(state, frame, chunks[1]);
    render_suggestions(state, frame, chunks[2]);
    render_graphs(state, frame, chunks[3]);
    render_footer(state, frame, chunks[4]);

    if state.dialog.is_some() {
        render_dialog(state, frame, area);
    }
    if state.snapshot.last_failure.is_some() {
        render_failure(state, frame, area);
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " bookgraph ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if state.snapshot.is_loading || !state.snapshot.generating.is_empty() {
        let frame_idx = (state.ticks / 3) as usize % SPINNER.len();
        spans.push(Span::styled(
            format!(" {} ", SPINNER[frame_idx]),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        format!(" graphs: {} ", state.snapshot.generated_graphs.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let focused = state.focus == Focus::Input;
    let mut lines = vec![Line::from(vec![
        Span::raw(state.input.as_str()),
        Span::styled(if focused { "_" } else { "" }, Style::default().fg(Color::DarkGray)),
    ])];
    if let Some(message) = state.validation_message() {
        lines.push(Line::from(Span::styled(message, Style::default().fg(Color::Red))));
    }

    let input = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Type a book title ")
            .border_style(focus_style(focused)),
    );
    frame.render_widget(input, area);
}

fn render_suggestions(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Suggestions ");
    let snapshot = &state.snapshot;

    if snapshot.is_loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        frame.render_widget(loading, area);
        return;
    }
    if snapshot.candidates.is_empty() {
        let text = if state.validation().is_valid() { "No Result!" } else { "" };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray)).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = snapshot
        .candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let mut spans = vec![Span::styled(
                candidate.title.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if !candidate.authors.is_empty() {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(
                    format!("[{}]", candidate.authors_display()),
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                ));
            }

            let item = ListItem::new(Line::from(spans));
            if i == state.suggestions.selected_index {
                item.style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                item
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_graphs(state: &AppState, frame: &mut Frame, area: Rect) {
    let focused = state.focus == Focus::Graphs;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Graphs ")
        .border_style(focus_style(focused));
    let snapshot = &state.snapshot;

    let mut items: Vec<ListItem> = snapshot
        .generated_graphs
        .iter()
        .enumerate()
        .map(|(i, graph)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3} ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(graph.subject_title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  nodes:{} edges:{}", graph.node_count, graph.edge_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    for title in &snapshot.generating {
        items.push(ListItem::new(Line::from(Span::styled(
            format!("    Generating: {title}..."),
            Style::default().fg(Color::Yellow),
        ))));
    }

    if items.is_empty() {
        let empty = Paragraph::new("No graph found!")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    // The list state keeps the selected graph in view once the list overflows
    let selected = focused.then_some(state.graphs.selected_index);
    let mut list_state = ListState::default().with_selected(selected);
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_dialog(state: &AppState, frame: &mut Frame, area: Rect) {
    let Some(graph) = state.dialog_graph() else {
        return;
    };
    let popup_area = centered_rect(80, 70, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            graph.subject_title.as_str(),
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(Span::styled(
            format!(
                "{} characters, {} nodes, {} edges",
                graph.visual.len(),
                graph.node_count,
                graph.edge_count
            ),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    lines.extend(graph.edges.iter().map(|edge| Line::from(edge.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("↑↓ scroll, Esc to close", Style::default().fg(Color::Cyan))));

    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Character graph ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true })
        .scroll((state.dialog_scroll, 0));
    frame.render_widget(dialog, popup_area);
}

fn render_failure(state: &AppState, frame: &mut Frame, area: Rect) {
    let Some(failure) = &state.snapshot.last_failure else {
        return;
    };
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);

    let banner = Paragraph::new(vec![
        Line::from(failure.to_string()),
        Line::from(""),
        Line::from(Span::styled("Press any key", Style::default().fg(Color::DarkGray))),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Error ")
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(banner, popup_area);
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    let mut spans = vec![key(" Esc"), Span::raw(" Quit ")];
    match state.focus {
        Focus::Input => {
            spans.extend([
                key(" ↑↓"),
                Span::raw(" Highlight "),
                key(" Tab"),
                Span::raw(" Accept "),
            ]);
            let generate_style = if state.can_generate() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(" Enter", generate_style));
            spans.push(Span::raw(" Generate Graph "));
            spans.extend([key(" ^N"), Span::raw(" Graphs ")]);
        }
        Focus::Graphs => {
            spans.extend([
                key(" ↑↓"),
                Span::raw(" Navigate "),
                key(" Enter"),
                Span::raw(" Open "),
                key(" ^B"),
                Span::raw(" Input "),
            ]);
        }
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
