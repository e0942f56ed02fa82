//! Flowchart parser
//!
//! Accepts the subset of Mermaid flowchart syntax that character graphs use:
//! a `graph`/`flowchart` header, node shapes, labelled links (including
//! chains and `&` groups) and `click` directives. Styling statements are
//! accepted and ignored. Anything else is a syntax error, which is how
//! malformed model output gets rejected before it reaches the page.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, trace};

use super::RenderError;

/// Layout direction from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    /// Ranks advance along the x axis
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftRight | Direction::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Rectangle,
    Round,
    Stadium,
    Subroutine,
    Circle,
    Diamond,
    Hexagon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Solid,
    Dotted,
    Thick,
}

/// End marker of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrowHead {
    #[default]
    None,
    /// `>` (or `<` at the source end)
    Arrow,
    /// `o`
    Circle,
    /// `x`
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub kind: EdgeKind,
    /// Marker at the target end (`-->`, `--o`, `--x` vs `---`)
    pub head: ArrowHead,
    /// Marker at the source end; only `<` is recognized there
    pub tail: ArrowHead,
}

/// `click <node> href "<url>"` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickLink {
    pub node: String,
    pub href: String,
    pub tooltip: Option<String>,
}

/// A parsed flowchart
#[derive(Debug, Clone)]
pub struct Diagram {
    pub direction: Direction,
    pub nodes: HashMap<String, Node>,
    /// Node ids in first-seen order
    pub order: Vec<String>,
    pub edges: Vec<Edge>,
    pub links: Vec<ClickLink>,
}

impl Diagram {
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        debug!(source_len = source.len(), "Diagram::parse: called");
        let mut statements: Vec<(usize, String)> = Vec::new();
        for (idx, raw_line) in source.lines().enumerate() {
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with("%%") {
                continue;
            }
            for stmt in split_statements(trimmed) {
                statements.push((idx + 1, stmt));
            }
        }

        let mut statements = statements.into_iter();
        let Some((header_line, header)) = statements.next() else {
            return Err(RenderError::Empty);
        };
        let direction = parse_header(header_line, &header)?;

        let mut builder = Builder::default();
        let mut open_subgraphs: Vec<usize> = Vec::new();

        for (line, stmt) in statements {
            let keyword = stmt.split_whitespace().next().unwrap_or_default();
            match keyword {
                "subgraph" => open_subgraphs.push(line),
                "end" if stmt == "end" => {
                    if open_subgraphs.pop().is_none() {
                        return Err(RenderError::syntax(line, "'end' without matching 'subgraph'"));
                    }
                }
                "click" => builder.click(line, &stmt)?,
                "style" | "classDef" | "class" | "linkStyle" | "direction" => {
                    trace!(line, %keyword, "Diagram::parse: ignoring styling statement");
                }
                _ => builder.statement(line, &stmt)?,
            }
        }

        if let Some(line) = open_subgraphs.last() {
            return Err(RenderError::syntax(*line, "subgraph missing closing 'end'"));
        }

        builder.finish(direction)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in first-seen order
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Display label for a node id, falling back to the id itself
    pub fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes.get(id).map(|n| n.label.as_str()).unwrap_or(id)
    }

    pub fn link_for(&self, id: &str) -> Option<&ClickLink> {
        self.links.iter().find(|l| l.node == id)
    }
}

fn parse_header(line: usize, header: &str) -> Result<Direction, RenderError> {
    let mut parts = header.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    if !keyword.eq_ignore_ascii_case("graph") && !keyword.eq_ignore_ascii_case("flowchart") {
        return Err(RenderError::syntax(
            line,
            format!("diagram must start with 'graph' or 'flowchart', found '{keyword}'"),
        ));
    }

    let direction = match parts.next().map(|d| d.to_ascii_uppercase()).as_deref() {
        None | Some("TD") | Some("TB") => Direction::TopDown,
        Some("BT") => Direction::BottomTop,
        Some("LR") => Direction::LeftRight,
        Some("RL") => Direction::RightLeft,
        Some(other) => {
            return Err(RenderError::syntax(
                line,
                format!("unsupported direction '{other}'; expected TD, TB, BT, LR or RL"),
            ));
        }
    };

    if let Some(extra) = parts.next() {
        return Err(RenderError::syntax(line, format!("unexpected '{extra}' after header")));
    }

    Ok(direction)
}

/// Split a line on `;` outside quotes and node shapes
fn split_statements(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0_i32;
    let mut in_quote = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth -= 1,
            ';' if !in_quote && depth <= 0 => {
                if !current.trim().is_empty() {
                    out.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

/// Shape delimiters, longest openers first
const SHAPE_DELIMITERS: [(&str, &str, NodeShape); 7] = [
    ("((", "))", NodeShape::Circle),
    ("([", "])", NodeShape::Stadium),
    ("[[", "]]", NodeShape::Subroutine),
    ("{{", "}}", NodeShape::Hexagon),
    ("[", "]", NodeShape::Rectangle),
    ("(", ")", NodeShape::Round),
    ("{", "}", NodeShape::Diamond),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkSpec {
    kind: EdgeKind,
    head: ArrowHead,
    tail: ArrowHead,
    label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Nodes(String),
    Link(LinkSpec),
}

fn starts_with(chars: &[char], pat: &str) -> bool {
    let mut i = 0;
    for p in pat.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

/// Index of `closer` at or after `from`, skipping quoted text
fn find_closer(chars: &[char], from: usize, closer: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '"' {
            in_quote = !in_quote;
        } else if !in_quote && starts_with(&chars[i..], closer) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Split a statement into alternating node groups and links
fn tokenize(line: usize, stmt: &str) -> Result<Vec<Token>, RenderError> {
    let chars: Vec<char> = stmt.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if matches!(ch, '[' | '(' | '{') {
            let (opener, closer, _) = SHAPE_DELIMITERS
                .iter()
                .find(|(open, _, _)| starts_with(&chars[i..], open))
                .copied()
                .unwrap_or(("[", "]", NodeShape::Rectangle));
            let body_start = i + opener.chars().count();
            let Some(close_at) = find_closer(&chars, body_start, closer) else {
                return Err(RenderError::syntax(line, format!("unclosed '{opener}' in '{stmt}'")));
            };
            let end = close_at + closer.chars().count();
            current.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if matches!(ch, ']' | ')' | '}') {
            return Err(RenderError::syntax(line, format!("unmatched '{ch}' in '{stmt}'")));
        }

        // `<-->`, `<-.->` and `<==>` carry an arrowhead on both ends
        let bidirectional = ch == '<' && matches!(chars.get(i + 1), Some('-' | '='));
        let at = if bidirectional { i + 1 } else { i };

        match match_link(&chars[at..]).map_err(|msg| RenderError::syntax(line, msg))? {
            Some((mut link, consumed)) => {
                if bidirectional {
                    link.tail = ArrowHead::Arrow;
                }
                i = at;
                tokens.push(Token::Nodes(current.trim().to_string()));
                current.clear();
                i += consumed;

                while chars.get(i).is_some_and(|c| c.is_whitespace()) {
                    i += 1;
                }
                if chars.get(i) == Some(&'|') {
                    let Some(end) = chars[i + 1..].iter().position(|c| *c == '|') else {
                        return Err(RenderError::syntax(line, format!("edge label missing closing '|' in '{stmt}'")));
                    };
                    let text: String = chars[i + 1..i + 1 + end].iter().collect();
                    link.label = non_empty(clean_label(&text));
                    i += end + 2;
                }
                tokens.push(Token::Link(link));
            }
            None => {
                current.push(ch);
                i += 1;
            }
        }
    }

    tokens.push(Token::Nodes(current.trim().to_string()));
    Ok(tokens)
}

/// Recognize a link operator at the start of `rest`
///
/// Returns the link and the number of chars consumed.
fn match_link(rest: &[char]) -> Result<Option<(LinkSpec, usize)>, String> {
    let first = match rest.first() {
        Some(c @ ('-' | '=')) => *c,
        _ => return Ok(None),
    };

    if first == '-' && rest.get(1) == Some(&'.') {
        if rest.get(2).is_some_and(|c| c.is_whitespace()) {
            return labelled_link(rest, 2, EdgeKind::Dotted).map(Some);
        }
        let mut j = 1;
        while rest.get(j) == Some(&'.') {
            j += 1;
        }
        if rest.get(j) != Some(&'-') {
            return Err("malformed dotted link".to_string());
        }
        j += 1;
        let (head, used) = end_marker(rest, j);
        return Ok(Some((
            LinkSpec {
                kind: EdgeKind::Dotted,
                head,
                tail: ArrowHead::None,
                label: None,
            },
            j + used,
        )));
    }

    let mut j = 0;
    while rest.get(j) == Some(&first) {
        j += 1;
    }
    if j < 2 {
        return Ok(None);
    }

    let kind = if first == '=' { EdgeKind::Thick } else { EdgeKind::Solid };
    let (head, used) = end_marker(rest, j);
    if head != ArrowHead::None || j >= 3 {
        return Ok(Some((
            LinkSpec {
                kind,
                head,
                tail: ArrowHead::None,
                label: None,
            },
            j + used,
        )));
    }
    if rest.get(j).is_some_and(|c| c.is_whitespace()) {
        return labelled_link(rest, j, kind).map(Some);
    }
    Ok(None)
}

/// Marker closing a link at `rest[at]`, with the chars it uses
///
/// `o` and `x` only count when nothing but whitespace, `|` or the end of the
/// statement follows, so `A---oscar` still reads as a link to `oscar`.
fn end_marker(rest: &[char], at: usize) -> (ArrowHead, usize) {
    let standalone = |i: usize| rest.get(i).is_none_or(|c| c.is_whitespace() || *c == '|');
    match rest.get(at) {
        Some('>') => (ArrowHead::Arrow, 1),
        Some('o') if standalone(at + 1) => (ArrowHead::Circle, 1),
        Some('x') if standalone(at + 1) => (ArrowHead::Cross, 1),
        _ => (ArrowHead::None, 0),
    }
}

/// Parse the `-- text -->` family, where the label sits inside the operator
fn labelled_link(rest: &[char], start: usize, kind: EdgeKind) -> Result<(LinkSpec, usize), String> {
    let (a, b) = match kind {
        EdgeKind::Dotted => ('.', '-'),
        EdgeKind::Thick => ('=', '='),
        EdgeKind::Solid => ('-', '-'),
    };

    let mut p = start;
    while p + 1 < rest.len() {
        if rest[p] == a && rest[p + 1] == b {
            let text: String = rest[start..p].iter().collect();
            let mut j = p + 2;
            while rest.get(j) == Some(&b) {
                j += 1;
            }
            let (head, used) = end_marker(rest, j);
            j += used;
            return Ok((
                LinkSpec {
                    kind,
                    head,
                    tail: ArrowHead::None,
                    label: non_empty(clean_label(&text)),
                },
                j,
            ));
        }
        p += 1;
    }
    Err("edge text missing closing link".to_string())
}

/// Split a node group on `&` outside shapes
fn split_group(group: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0_i32;
    let mut in_quote = false;
    for ch in group.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' | '(' | '{' if !in_quote => depth += 1,
            ']' | ')' | '}' if !in_quote => depth -= 1,
            '&' if !in_quote && depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    out.push(current.trim().to_string());
    out
}

fn clean_label(raw: &str) -> String {
    let mut label = raw.trim();
    if label.len() >= 2 && label.starts_with('"') && label.ends_with('"') {
        label = &label[1..label.len() - 1];
    }
    label
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n")
        .trim()
        .to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Drop a trailing `:::className`; styling is not rendered
fn strip_class_suffix(node: &str) -> &str {
    match node.rfind(":::") {
        Some(pos) if is_valid_id(&node[pos + 3..]) => node[..pos].trim_end(),
        _ => node,
    }
}

/// A node reference: id plus an optional explicit shape
struct NodeSpec {
    id: String,
    shape: Option<(String, NodeShape)>,
}

impl NodeSpec {
    fn parse(line: usize, raw: &str) -> Result<Self, RenderError> {
        let trimmed = strip_class_suffix(raw.trim());
        let id_end = trimmed.find(['[', '(', '{']).unwrap_or(trimmed.len());
        let id = trimmed[..id_end].trim();
        if !is_valid_id(id) {
            return Err(RenderError::syntax(line, format!("invalid node reference '{trimmed}'")));
        }

        let remainder = &trimmed[id_end..];
        if remainder.is_empty() {
            return Ok(Self {
                id: id.to_string(),
                shape: None,
            });
        }

        for (open, close, shape) in SHAPE_DELIMITERS {
            if remainder.starts_with(open) && remainder.ends_with(close) && remainder.len() >= open.len() + close.len() {
                let inner = &remainder[open.len()..remainder.len() - close.len()];
                let quoted = inner.trim().len() >= 2 && inner.trim().starts_with('"') && inner.trim().ends_with('"');
                // Unquoted labels cannot carry shape delimiters
                if !quoted && inner.contains(['[', ']', '(', ')', '{', '}']) {
                    return Err(RenderError::syntax(
                        line,
                        format!("unmatched bracket in label of node '{id}': '{remainder}'"),
                    ));
                }
                let label = clean_label(inner);
                return Ok(Self {
                    id: id.to_string(),
                    shape: Some((if label.is_empty() { id.to_string() } else { label }, shape)),
                });
            }
        }

        Err(RenderError::syntax(
            line,
            format!("unexpected text after node '{id}': '{remainder}'"),
        ))
    }
}

#[derive(Default)]
struct Builder {
    nodes: HashMap<String, Node>,
    order: Vec<String>,
    edges: Vec<Edge>,
    links: Vec<(usize, ClickLink)>,
}

impl Builder {
    /// Register a node, letting an explicit shape override an earlier bare reference
    fn intern(&mut self, spec: NodeSpec) -> String {
        let NodeSpec { id, shape } = spec;
        match self.nodes.entry(id.clone()) {
            Entry::Vacant(entry) => {
                self.order.push(id.clone());
                let (label, shape) = shape.unwrap_or_else(|| (id.clone(), NodeShape::Rectangle));
                entry.insert(Node {
                    id: id.clone(),
                    label,
                    shape,
                });
            }
            Entry::Occupied(mut entry) => {
                if let Some((label, shape)) = shape {
                    let node = entry.get_mut();
                    node.label = label;
                    node.shape = shape;
                }
            }
        }
        id
    }

    fn group(&mut self, line: usize, group: &str) -> Result<Vec<String>, RenderError> {
        split_group(group)
            .iter()
            .map(|raw| NodeSpec::parse(line, raw).map(|spec| self.intern(spec)))
            .collect()
    }

    fn statement(&mut self, line: usize, stmt: &str) -> Result<(), RenderError> {
        trace!(line, %stmt, "Builder::statement: called");
        let tokens = tokenize(line, stmt)?;

        let mut previous: Option<Vec<String>> = None;
        let mut pending: Option<LinkSpec> = None;

        for token in tokens {
            match token {
                Token::Nodes(group) => {
                    if group.is_empty() {
                        let message = if previous.is_none() {
                            "edge missing source node"
                        } else {
                            "edge missing target node"
                        };
                        return Err(RenderError::syntax(line, message));
                    }
                    let ids = self.group(line, &group)?;
                    if let (Some(from), Some(link)) = (&previous, pending.take()) {
                        for f in from {
                            for t in &ids {
                                self.edges.push(Edge {
                                    from: f.clone(),
                                    to: t.clone(),
                                    label: link.label.clone(),
                                    kind: link.kind,
                                    head: link.head,
                                    tail: link.tail,
                                });
                            }
                        }
                    }
                    previous = Some(ids);
                }
                Token::Link(link) => pending = Some(link),
            }
        }
        Ok(())
    }

    fn click(&mut self, line: usize, stmt: &str) -> Result<(), RenderError> {
        let rest = stmt["click".len()..].trim_start();
        let id_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let id = &rest[..id_end];
        if !is_valid_id(id) {
            return Err(RenderError::syntax(line, "click directive missing node id"));
        }

        let mut args = rest[id_end..].trim_start();
        if let Some(after) = args.strip_prefix("href") {
            args = after.trim_start();
        }
        if !args.starts_with('"') {
            debug!(line, %id, "Builder::click: callback directives are not supported, ignoring");
            return Ok(());
        }

        let mut quoted = Vec::new();
        let mut remaining = args;
        while let Some(after_open) = remaining.trim_start().strip_prefix('"') {
            let Some(close) = after_open.find('"') else {
                return Err(RenderError::syntax(line, "unterminated string in click directive"));
            };
            quoted.push(after_open[..close].to_string());
            remaining = &after_open[close + 1..];
        }

        let mut quoted = quoted.into_iter();
        let href = quoted.next().unwrap_or_default();
        self.links.push((
            line,
            ClickLink {
                node: id.to_string(),
                href,
                tooltip: quoted.next().and_then(non_empty),
            },
        ));
        Ok(())
    }

    fn finish(self, direction: Direction) -> Result<Diagram, RenderError> {
        if self.nodes.is_empty() {
            return Err(RenderError::Empty);
        }

        let mut links = Vec::with_capacity(self.links.len());
        for (line, link) in self.links {
            if !self.nodes.contains_key(&link.node) {
                return Err(RenderError::syntax(
                    line,
                    format!("click directive references unknown node '{}'", link.node),
                ));
            }
            links.push(link);
        }

        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            links = links.len(),
            "Builder::finish: diagram parsed"
        );
        Ok(Diagram {
            direction,
            nodes: self.nodes,
            order: self.order,
            edges: self.edges,
            links,
        })
    }
}
