//! Layered layout for flowcharts
//!
//! Nodes are ranked by longest path from the sources (cycle-closing edges are
//! ignored for ranking), ordered within a rank by the barycenter of their
//! parents, and packed into rows (TD/BT) or columns (LR/RL).

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::diagram::{Diagram, Direction, NodeShape};

pub(crate) const CHAR_WIDTH: f32 = 7.5;
pub(crate) const LINE_HEIGHT: f32 = 18.0;
const PAD_X: f32 = 16.0;
const PAD_Y: f32 = 10.0;
const MIN_WIDTH: f32 = 60.0;
const MIN_HEIGHT: f32 = 38.0;
const NODE_GAP: f32 = 40.0;
const RANK_GAP: f32 = 70.0;
pub(crate) const MARGIN: f32 = 20.0;

/// Placed node: center point and size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub shape: NodeShape,
}

impl NodeBox {
    /// Point where a ray from the center toward `(tx, ty)` leaves the shape
    pub fn boundary_toward(&self, tx: f32, ty: f32) -> (f32, f32) {
        let dx = tx - self.x;
        let dy = ty - self.y;
        if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
            return (self.x, self.y);
        }

        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        let t = match self.shape {
            NodeShape::Circle => hw / (dx * dx + dy * dy).sqrt(),
            NodeShape::Diamond => 1.0 / (dx.abs() / hw + dy.abs() / hh),
            _ => {
                let tx = if dx.abs() > f32::EPSILON { hw / dx.abs() } else { f32::INFINITY };
                let ty = if dy.abs() > f32::EPSILON { hh / dy.abs() } else { f32::INFINITY };
                tx.min(ty)
            }
        };
        (self.x + dx * t, self.y + dy * t)
    }
}

/// Node placement for a whole diagram
#[derive(Debug, Clone)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub boxes: HashMap<String, NodeBox>,
    /// Node ids per rank, in placement order
    pub ranks: Vec<Vec<String>>,
}

impl Layout {
    pub fn compute(diagram: &Diagram) -> Self {
        debug!(nodes = diagram.order.len(), "Layout::compute: called");
        let index: HashMap<&str, usize> = diagram
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let n = diagram.order.len();

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &diagram.edges {
            if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
                && from != to
            {
                adjacency[from].push(to);
            }
        }

        let forward = acyclic_edges(&adjacency);
        let rank = longest_path_ranks(&forward);
        let rank_count = rank.iter().copied().max().map_or(0, |r| r + 1);

        let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (node, r) in rank.iter().enumerate() {
            ranks[*r].push(node);
        }
        order_by_barycenter(&mut ranks, &forward);

        let sizes: Vec<(f32, f32)> = diagram
            .order
            .iter()
            .map(|id| diagram.node(id).map_or((MIN_WIDTH, MIN_HEIGHT), |n| node_size(&n.label, n.shape)))
            .collect();

        let horizontal = diagram.direction.is_horizontal();
        // (main, cross) extent of each node: main runs along the rank axis
        let extent = |i: usize| {
            let (w, h) = sizes[i];
            if horizontal { (w, h) } else { (h, w) }
        };

        let thickness: Vec<f32> = ranks
            .iter()
            .map(|nodes| nodes.iter().map(|&i| extent(i).0).fold(0.0, f32::max))
            .collect();
        let spans: Vec<f32> = ranks
            .iter()
            .map(|nodes| {
                let total: f32 = nodes.iter().map(|&i| extent(i).1).sum();
                total + NODE_GAP * nodes.len().saturating_sub(1) as f32
            })
            .collect();
        let max_span = spans.iter().copied().fold(0.0, f32::max);
        let main_total = thickness.iter().sum::<f32>() + RANK_GAP * rank_count.saturating_sub(1) as f32;

        let mut boxes = HashMap::with_capacity(n);
        let mut main_cursor = MARGIN;
        for (r, nodes) in ranks.iter().enumerate() {
            let main_center = main_cursor + thickness[r] / 2.0;
            let mut cross_cursor = MARGIN + (max_span - spans[r]) / 2.0;
            for &i in nodes {
                let (_, cross) = extent(i);
                let cross_center = cross_cursor + cross / 2.0;
                cross_cursor += cross + NODE_GAP;

                let (mut x, mut y) = if horizontal {
                    (main_center, cross_center)
                } else {
                    (cross_center, main_center)
                };
                match diagram.direction {
                    Direction::BottomTop => y = 2.0 * MARGIN + main_total - y,
                    Direction::RightLeft => x = 2.0 * MARGIN + main_total - x,
                    _ => {}
                }

                let id = &diagram.order[i];
                let shape = diagram.node(id).map_or(NodeShape::Rectangle, |n| n.shape);
                boxes.insert(
                    id.clone(),
                    NodeBox {
                        x,
                        y,
                        width: sizes[i].0,
                        height: sizes[i].1,
                        shape,
                    },
                );
            }
            main_cursor += thickness[r] + RANK_GAP;
        }

        let (width, height) = if horizontal {
            (main_total + 2.0 * MARGIN, max_span + 2.0 * MARGIN)
        } else {
            (max_span + 2.0 * MARGIN, main_total + 2.0 * MARGIN)
        };

        let ranks = ranks
            .into_iter()
            .map(|nodes| nodes.into_iter().map(|i| diagram.order[i].clone()).collect())
            .collect();

        Self {
            width,
            height,
            boxes,
            ranks,
        }
    }
}

/// Size of a node box for a label, before any layout
pub(crate) fn node_size(label: &str, shape: NodeShape) -> (f32, f32) {
    let lines: Vec<&str> = label.lines().collect();
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f32;
    let w = (widest * CHAR_WIDTH + 2.0 * PAD_X).max(MIN_WIDTH);
    let h = (lines.len().max(1) as f32 * LINE_HEIGHT + 2.0 * PAD_Y).max(MIN_HEIGHT);

    match shape {
        NodeShape::Circle => {
            let d = w.max(h);
            (d, d)
        }
        NodeShape::Diamond => (w + h * 0.6, h * 1.6),
        NodeShape::Hexagon => (w + h * 0.5, h),
        NodeShape::Round | NodeShape::Stadium => (w + h * 0.3, h),
        NodeShape::Rectangle | NodeShape::Subroutine => (w, h),
    }
}

/// Drop the edges that close cycles, found by depth-first search in node order
fn acyclic_edges(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: u8 = 0;
    const ON_STACK: u8 = 1;
    const DONE: u8 = 2;

    let n = adjacency.len();
    let mut state = vec![UNVISITED; n];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); n];

    for start in 0..n {
        if state[start] != UNVISITED {
            continue;
        }
        state[start] = ON_STACK;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            if let Some(&child) = adjacency[node].get(*next) {
                *next += 1;
                match state[child] {
                    ON_STACK => {}
                    DONE => forward[node].push(child),
                    _ => {
                        forward[node].push(child);
                        state[child] = ON_STACK;
                        stack.push((child, 0));
                    }
                }
            } else {
                state[node] = DONE;
                stack.pop();
            }
        }
    }
    forward
}

/// Rank = longest path from any source over an acyclic edge set
fn longest_path_ranks(forward: &[Vec<usize>]) -> Vec<usize> {
    let n = forward.len();
    let mut indegree = vec![0_usize; n];
    for children in forward {
        for &c in children {
            indegree[c] += 1;
        }
    }

    let mut rank = vec![0_usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    while let Some(node) = queue.pop_front() {
        for &child in &forward[node] {
            rank[child] = rank[child].max(rank[node] + 1);
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    rank
}

/// One downward sweep: sort each rank by the mean position of its parents
fn order_by_barycenter(ranks: &mut [Vec<usize>], forward: &[Vec<usize>]) {
    let n = forward.len();
    let mut position = vec![0.0_f32; n];
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, children) in forward.iter().enumerate() {
        for &c in children {
            parents[c].push(node);
        }
    }

    for r in 0..ranks.len() {
        if r > 0 {
            let previous: &[usize] = &ranks[r - 1];
            let keyed: Vec<(f32, usize)> = ranks[r]
                .iter()
                .enumerate()
                .map(|(slot, &node)| {
                    let placed: Vec<f32> = parents[node]
                        .iter()
                        .filter(|p| previous.contains(p))
                        .map(|&p| position[p])
                        .collect();
                    let key = if placed.is_empty() {
                        slot as f32
                    } else {
                        placed.iter().sum::<f32>() / placed.len() as f32
                    };
                    (key, node)
                })
                .collect();
            let mut keyed = keyed;
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            ranks[r] = keyed.into_iter().map(|(_, node)| node).collect();
        }
        for (slot, &node) in ranks[r].iter().enumerate() {
            position[node] = slot as f32;
        }
    }
}
