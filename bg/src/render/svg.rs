//! SVG writer for parsed flowcharts

use async_trait::async_trait;
use tracing::debug;

use super::diagram::{ArrowHead, Diagram, Edge, EdgeKind, Node, NodeShape};
use super::layout::{CHAR_WIDTH, LINE_HEIGHT, Layout, NodeBox};
use super::{DiagramRenderer, RenderConfig, RenderError, RenderedDiagram, SecurityLevel, escape_xml};

const NODE_FILL: &str = "#ECECFF";
const NODE_STROKE: &str = "#9370DB";
const EDGE_STROKE: &str = "#333333";
const TEXT_FILL: &str = "#333333";
const LABEL_FILL: &str = "#E8E8E8";
const FONT: &str = "trebuchet ms, verdana, arial, sans-serif";
const FONT_SIZE: f32 = 14.0;
const LOOP_REACH: f32 = 30.0;

/// Renders Mermaid flowchart text with the built-in layered layout
pub struct MermaidRenderer {
    config: RenderConfig,
}

impl MermaidRenderer {
    pub fn new(config: RenderConfig) -> Self {
        debug!(?config, "MermaidRenderer::new: called");
        Self { config }
    }

    /// Parse, lay out and write one diagram
    pub fn render_source(&self, render_id: &str, source: &str) -> Result<RenderedDiagram, RenderError> {
        debug!(%render_id, source_len = source.len(), "render_source: called");
        let diagram = Diagram::parse(source)?;
        let layout = Layout::compute(&diagram);
        let svg = self.write_svg(render_id, &diagram, &layout);
        debug!(%render_id, svg_len = svg.len(), "render_source: success");
        Ok(RenderedDiagram { svg, diagram })
    }

    fn write_svg(&self, render_id: &str, diagram: &Diagram, layout: &Layout) -> String {
        let id = escape_xml(render_id);
        let mut out = String::with_capacity(1024 + diagram.order.len() * 256);

        out.push_str(&format!(
            r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w:.1}" height="{h:.1}" viewBox="0 0 {w:.1} {h:.1}" role="img" font-family="{FONT}" font-size="{FONT_SIZE}">"#,
            w = layout.width,
            h = layout.height,
        ));
        out.push_str(&format!(
            concat!(
                r#"<defs><marker id="{id}-arrow" viewBox="0 0 10 10" refX="9" refY="5" markerUnits="userSpaceOnUse" markerWidth="10" markerHeight="10" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="{stroke}"/></marker>"#,
                r##"<marker id="{id}-circle" viewBox="0 0 10 10" refX="9" refY="5" markerUnits="userSpaceOnUse" markerWidth="10" markerHeight="10" orient="auto"><circle cx="5" cy="5" r="4" fill="#FFFFFF" stroke="{stroke}" stroke-width="1.5"/></marker>"##,
                r#"<marker id="{id}-cross" viewBox="0 0 10 10" refX="5" refY="5" markerUnits="userSpaceOnUse" markerWidth="10" markerHeight="10" orient="auto"><path d="M 1 1 L 9 9 M 1 9 L 9 1" stroke="{stroke}" stroke-width="2"/></marker></defs>"#,
            ),
            id = id,
            stroke = EDGE_STROKE,
        ));

        out.push_str(r#"<g class="edges">"#);
        for edge in &diagram.edges {
            if let (Some(from), Some(to)) = (layout.boxes.get(&edge.from), layout.boxes.get(&edge.to)) {
                write_edge(&mut out, edge, from, to, &id);
            }
        }
        out.push_str("</g>");

        out.push_str(r#"<g class="nodes">"#);
        for node in diagram.nodes_in_order() {
            let Some(b) = layout.boxes.get(&node.id) else {
                continue;
            };
            let link = match self.config.security_level {
                SecurityLevel::Loose => diagram.link_for(&node.id),
                SecurityLevel::Strict => None,
            };
            if let Some(link) = link {
                let href = escape_xml(&link.href);
                out.push_str(&format!(r#"<a xlink:href="{href}" href="{href}">"#));
                if let Some(tooltip) = &link.tooltip {
                    out.push_str(&format!("<title>{}</title>", escape_xml(tooltip)));
                }
                write_node(&mut out, &id, node, b);
                out.push_str("</a>");
            } else {
                write_node(&mut out, &id, node, b);
            }
        }
        out.push_str("</g></svg>");
        out
    }
}

#[async_trait]
impl DiagramRenderer for MermaidRenderer {
    async fn render(&self, render_id: &str, source: &str) -> Result<RenderedDiagram, RenderError> {
        self.render_source(render_id, source)
    }
}

fn edge_style(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Solid => r#"stroke-width="2""#,
        EdgeKind::Dotted => r#"stroke-width="2" stroke-dasharray="3 3""#,
        EdgeKind::Thick => r#"stroke-width="3.5""#,
    }
}

/// Marker id suffix for an end, if it draws anything
fn marker_name(head: ArrowHead) -> Option<&'static str> {
    match head {
        ArrowHead::None => None,
        ArrowHead::Arrow => Some("arrow"),
        ArrowHead::Circle => Some("circle"),
        ArrowHead::Cross => Some("cross"),
    }
}

fn write_edge(out: &mut String, edge: &Edge, from: &NodeBox, to: &NodeBox, render_id: &str) {
    let style = edge_style(edge.kind);
    let mut marker = String::new();
    if let Some(name) = marker_name(edge.tail) {
        marker.push_str(&format!(r#" marker-start="url(#{render_id}-{name})""#));
    }
    if let Some(name) = marker_name(edge.head) {
        marker.push_str(&format!(r#" marker-end="url(#{render_id}-{name})""#));
    }

    let (label_x, label_y) = if edge.from == edge.to {
        let (sx, sy) = (from.x + from.width / 4.0, from.y - from.height / 2.0);
        let (ex, ey) = (from.x + from.width / 2.0, from.y - from.height / 4.0);
        out.push_str(&format!(
            r#"<path d="M {sx:.1} {sy:.1} C {sx:.1} {c1y:.1}, {c2x:.1} {ey:.1}, {ex:.1} {ey:.1}" fill="none" stroke="{EDGE_STROKE}" {style}{marker}/>"#,
            c1y = sy - LOOP_REACH,
            c2x = ex + LOOP_REACH,
        ));
        (sx + LOOP_REACH / 2.0, sy - LOOP_REACH)
    } else {
        let (x1, y1) = from.boundary_toward(to.x, to.y);
        let (x2, y2) = to.boundary_toward(from.x, from.y);
        out.push_str(&format!(
            r#"<path d="M {x1:.1} {y1:.1} L {x2:.1} {y2:.1}" fill="none" stroke="{EDGE_STROKE}" {style}{marker}/>"#
        ));
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    };

    if let Some(label) = &edge.label {
        let lines: Vec<&str> = label.lines().collect();
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f32;
        let w = widest * CHAR_WIDTH + 8.0;
        let h = lines.len().max(1) as f32 * LINE_HEIGHT + 4.0;
        out.push_str(&format!(
            r#"<g class="edge-label"><rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{LABEL_FILL}" opacity="0.9"/>"#,
            x = label_x - w / 2.0,
            y = label_y - h / 2.0,
        ));
        write_text(out, label_x, label_y, &lines);
        out.push_str("</g>");
    }
}

fn write_node(out: &mut String, render_id: &str, node: &Node, b: &NodeBox) {
    let node_id = format!("{render_id}-node-{}", escape_xml(&node.id));
    let paint = format!(r#"fill="{NODE_FILL}" stroke="{NODE_STROKE}" stroke-width="1""#);
    let (left, top) = (b.x - b.width / 2.0, b.y - b.height / 2.0);

    out.push_str(&format!(r#"<g id="{node_id}" class="node">"#));
    match b.shape {
        NodeShape::Rectangle => out.push_str(&format!(
            r#"<rect x="{left:.1}" y="{top:.1}" width="{w:.1}" height="{h:.1}" {paint}/>"#,
            w = b.width,
            h = b.height,
        )),
        NodeShape::Round | NodeShape::Stadium => {
            let rx = if b.shape == NodeShape::Round { 5.0 } else { b.height / 2.0 };
            out.push_str(&format!(
                r#"<rect x="{left:.1}" y="{top:.1}" width="{w:.1}" height="{h:.1}" rx="{rx:.1}" ry="{rx:.1}" {paint}/>"#,
                w = b.width,
                h = b.height,
            ));
        }
        NodeShape::Subroutine => {
            let bottom = top + b.height;
            out.push_str(&format!(
                r#"<rect x="{left:.1}" y="{top:.1}" width="{w:.1}" height="{h:.1}" {paint}/>"#,
                w = b.width,
                h = b.height,
            ));
            for x in [left + 8.0, left + b.width - 8.0] {
                out.push_str(&format!(
                    r#"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="{NODE_STROKE}" stroke-width="1"/>"#
                ));
            }
        }
        NodeShape::Circle => out.push_str(&format!(
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" {paint}/>"#,
            cx = b.x,
            cy = b.y,
            r = b.width / 2.0,
        )),
        NodeShape::Diamond => {
            let points = [
                (b.x, top),
                (left + b.width, b.y),
                (b.x, top + b.height),
                (left, b.y),
            ];
            out.push_str(&format!(r#"<polygon points="{}" {paint}/>"#, points_attr(&points)));
        }
        NodeShape::Hexagon => {
            let inset = b.height / 4.0;
            let right = left + b.width;
            let bottom = top + b.height;
            let points = [
                (left + inset, top),
                (right - inset, top),
                (right, b.y),
                (right - inset, bottom),
                (left + inset, bottom),
                (left, b.y),
            ];
            out.push_str(&format!(r#"<polygon points="{}" {paint}/>"#, points_attr(&points)));
        }
    }

    let lines: Vec<&str> = node.label.lines().collect();
    write_text(out, b.x, b.y, &lines);
    out.push_str("</g>");
}

/// Centered multi-line text; each line is its own tspan
fn write_text(out: &mut String, cx: f32, cy: f32, lines: &[&str]) {
    let first = cy - (lines.len().saturating_sub(1) as f32) * LINE_HEIGHT / 2.0;
    out.push_str(&format!(
        r#"<text x="{cx:.1}" y="{cy:.1}" text-anchor="middle" dominant-baseline="central" fill="{TEXT_FILL}">"#
    ));
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!(
            r#"<tspan x="{cx:.1}" y="{y:.1}">{text}</tspan>"#,
            y = first + i as f32 * LINE_HEIGHT,
            text = escape_xml(line),
        ));
    }
    out.push_str("</text>");
}

fn points_attr(points: &[(f32, f32)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(level: SecurityLevel, source: &str) -> String {
        MermaidRenderer::new(RenderConfig { security_level: level })
            .render_source("graph_1", source)
            .unwrap()
            .svg
    }

    #[test]
    fn test_root_and_marker_use_render_id() {
        let svg = render(SecurityLevel::Loose, "graph TD\nA[Dorothy] -->|Pet| B[Toto]");
        assert!(svg.starts_with(r#"<svg id="graph_1""#));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"<marker id="graph_1-arrow""#));
        assert!(svg.contains("url(#graph_1-arrow)"));
        assert!(svg.contains(r#"id="graph_1-node-A""#));
    }

    #[test]
    fn test_labels_are_written_and_escaped() {
        let svg = render(SecurityLevel::Loose, "graph LR\nA[\"Tom & <Jerry>\"] -->|cat's foe| B[Spike]");
        assert!(svg.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(svg.contains("cat&#39;s foe"));
        assert!(svg.contains(">Spike</tspan>"));
        assert!(!svg.contains("<Jerry>"));
    }

    #[test]
    fn test_multiline_label_gets_one_tspan_per_line() {
        let svg = render(SecurityLevel::Loose, "graph TD\nA[Uncle Henry<br>Aunt Em]");
        assert!(svg.contains(">Uncle Henry</tspan>"));
        assert!(svg.contains(">Aunt Em</tspan>"));
    }

    #[test]
    fn test_edge_kinds() {
        let svg = render(SecurityLevel::Loose, "graph TD\nA-.->B\nB==>C\nC---D");
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains(r#"stroke-width="3.5""#));
        // three edges, two with arrowheads
        assert_eq!(svg.matches("marker-end=").count(), 2);
    }

    #[test]
    fn test_edge_end_markers() {
        let svg = render(SecurityLevel::Loose, "graph LR\nA <--> B\nB --o C\nC --x D");
        assert!(svg.contains(r#"<marker id="graph_1-circle""#));
        assert!(svg.contains(r#"<marker id="graph_1-cross""#));
        assert_eq!(svg.matches(r#"marker-start="url(#graph_1-arrow)""#).count(), 1);
        assert_eq!(svg.matches(r#"marker-end="url(#graph_1-arrow)""#).count(), 1);
        assert_eq!(svg.matches(r#"marker-end="url(#graph_1-circle)""#).count(), 1);
        assert_eq!(svg.matches(r#"marker-end="url(#graph_1-cross)""#).count(), 1);

        // markers survive the sanitizer
        let trusted = crate::render::TrustedSvg::sanitize(&svg).unwrap();
        assert!(trusted.as_str().contains(r#"marker-start="url(#graph_1-arrow)""#));
        assert!(trusted.as_str().contains(r#"<marker id="graph_1-cross""#));
    }

    #[test]
    fn test_shapes() {
        let svg = render(SecurityLevel::Loose, "graph TD\nA((Oz))\nB{Choice}\nC{{Hex}}\nD([Pill])");
        assert!(svg.contains("<circle"));
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert!(svg.contains("rx="));
    }

    #[test]
    fn test_self_loop_is_drawn() {
        let svg = render(SecurityLevel::Loose, "graph TD\nA -->|Self| A");
        assert!(svg.contains(" C "));
        assert!(svg.contains(">Self</tspan>"));
    }

    #[test]
    fn test_click_links_follow_security_level() {
        let source = "graph TD\nA[Oz]\nclick A \"https://example.org/oz\" \"Visit\"";
        let loose = render(SecurityLevel::Loose, source);
        assert!(loose.contains(r#"<a xlink:href="https://example.org/oz""#));
        assert!(loose.contains("<title>Visit</title>"));

        let strict = render(SecurityLevel::Strict, source);
        assert!(!strict.contains("<a "));
    }

    #[test]
    fn test_syntax_error_propagates() {
        let renderer = MermaidRenderer::new(RenderConfig::default());
        let err = renderer.render_source("graph_1", "Here is your graph:\nA-->B").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_distinct_ids_do_not_collide() {
        let renderer = MermaidRenderer::new(RenderConfig::default());
        let a = renderer.render_source("graph_a", "graph TD\nA-->B").unwrap().svg;
        let b = renderer.render_source("graph_b", "graph TD\nA-->B").unwrap().svg;
        assert!(a.contains("graph_a-arrow") && !a.contains("graph_b"));
        assert!(b.contains("graph_b-arrow") && !b.contains("graph_a"));
    }
}
