//! Allow-list SVG sanitizer
//!
//! Markup is re-serialized element by element. Only allow-listed elements and
//! attributes survive; everything else is dropped together with its content.
//! Link targets are limited to fragments and http(s)/mailto URLs, and `url()`
//! references to fragments. Comments, processing instructions and doctypes
//! are removed. Text and attribute values are entity-decoded and re-escaped,
//! so the output never carries markup that was hidden in an encoding.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::{SanitizeError, escape_xml};

const ALLOWED_ELEMENTS: &[&str] = &[
    "svg", "g", "defs", "marker", "path", "rect", "ellipse", "circle", "polygon", "line", "polyline", "text",
    "tspan", "title", "a",
];

/// Canonical spellings; matching is case-insensitive
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "id",
    "class",
    "role",
    "xmlns",
    "xmlns:xlink",
    "width",
    "height",
    "viewBox",
    "preserveAspectRatio",
    "x",
    "y",
    "x1",
    "y1",
    "x2",
    "y2",
    "cx",
    "cy",
    "r",
    "rx",
    "ry",
    "dx",
    "dy",
    "d",
    "points",
    "transform",
    "fill",
    "fill-opacity",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "stroke-opacity",
    "opacity",
    "font-family",
    "font-size",
    "font-weight",
    "text-anchor",
    "dominant-baseline",
    "marker-start",
    "marker-end",
    "markerUnits",
    "markerWidth",
    "markerHeight",
    "refX",
    "refY",
    "orient",
    "href",
    "xlink:href",
];

const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:"];

/// SVG markup that has been through the sanitizer
///
/// The only way to build one is [`TrustedSvg::sanitize`], so holding a value
/// means the markup is safe to embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedSvg(String);

impl TrustedSvg {
    pub fn sanitize(markup: &str) -> Result<Self, SanitizeError> {
        debug!(markup_len = markup.len(), "TrustedSvg::sanitize: called");
        let out = Sanitizer::new(markup).run()?;
        debug!(output_len = out.len(), "TrustedSvg::sanitize: success");
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrustedSvg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn malformed(offset: usize, message: impl Into<String>) -> SanitizeError {
    SanitizeError::Malformed {
        offset,
        message: message.into(),
    }
}

struct Sanitizer<'a> {
    src: &'a str,
    pos: usize,
    out: String,
    /// Open elements as written in the source
    stack: Vec<String>,
    /// Stack depth of the outermost element being dropped
    drop_from: Option<usize>,
    saw_root: bool,
}

impl<'a> Sanitizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            out: String::with_capacity(src.len()),
            stack: Vec::new(),
            drop_from: None,
            saw_root: false,
        }
    }

    fn run(mut self) -> Result<String, SanitizeError> {
        let src = self.src;
        while self.pos < src.len() {
            let rest = &src[self.pos..];
            if rest.starts_with("<!--") {
                self.skip_past("-->", "unterminated comment")?;
            } else if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let text = self.take_until("]]>", "unterminated CDATA section")?;
                self.write_text(text);
            } else if rest.starts_with("<?") {
                self.skip_past("?>", "unterminated processing instruction")?;
            } else if rest.starts_with("<!") {
                self.skip_past(">", "unterminated declaration")?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<') {
                self.open_tag()?;
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = &rest[..end];
                self.pos += end;
                if !self.stack.is_empty() {
                    self.write_text(&decode_entities(text));
                }
            }

            if self.saw_root && self.stack.is_empty() {
                break;
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(malformed(self.src.len(), format!("unclosed <{open}>")));
        }
        if !self.saw_root {
            return Err(SanitizeError::NoSvgRoot);
        }
        Ok(self.out)
    }

    fn write_text(&mut self, text: &str) {
        if self.drop_from.is_none() && !self.stack.is_empty() {
            self.out.push_str(&escape_xml(text));
        }
    }

    fn skip_past(&mut self, delimiter: &str, message: &str) -> Result<(), SanitizeError> {
        self.take_until(delimiter, message).map(|_| ())
    }

    /// Text up to `delimiter`, leaving the cursor after it
    fn take_until(&mut self, delimiter: &str, message: &str) -> Result<&'a str, SanitizeError> {
        let src = self.src;
        let Some(len) = src[self.pos..].find(delimiter) else {
            return Err(malformed(self.pos, message));
        };
        let text = &src[self.pos..self.pos + len];
        self.pos += len + delimiter.len();
        Ok(text)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn read_name(&mut self) -> Option<&'a str> {
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    fn open_tag(&mut self) -> Result<(), SanitizeError> {
        let start = self.pos;
        self.pos += 1;
        let name = self.read_name().ok_or_else(|| malformed(start, "expected element name"))?;

        let mut attributes: Vec<(&'a str, String)> = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            let rest = &self.src[self.pos..];
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.is_empty() {
                return Err(malformed(start, format!("unterminated <{name}> tag")));
            }

            let attr_start = self.pos;
            let attr = self
                .read_name()
                .ok_or_else(|| malformed(attr_start, format!("bad attribute in <{name}>")))?;
            self.skip_whitespace();
            if self.peek() != Some('=') {
                return Err(malformed(self.pos, format!("attribute '{attr}' missing value")));
            }
            self.pos += 1;
            self.skip_whitespace();
            let quote = match self.peek() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(malformed(self.pos, format!("value of '{attr}' must be quoted"))),
            };
            self.pos += 1;
            let src = self.src;
            let Some(len) = src[self.pos..].find(quote) else {
                return Err(malformed(attr_start, format!("unterminated value of '{attr}'")));
            };
            let raw = &src[self.pos..self.pos + len];
            self.pos += len + 1;
            attributes.push((attr, decode_entities(raw)));
        };

        let element = name.to_ascii_lowercase();
        if self.stack.is_empty() {
            if element != "svg" {
                debug!(%element, "open_tag: top-level element is not svg");
                return Err(SanitizeError::NoSvgRoot);
            }
            self.saw_root = true;
        }

        if self.drop_from.is_none() {
            if ALLOWED_ELEMENTS.contains(&element.as_str()) {
                self.write_open_tag(&element, &attributes, self_closing);
            } else {
                debug!(%element, "open_tag: dropping element");
                if !self_closing {
                    self.drop_from = Some(self.stack.len());
                }
            }
        }

        if !self_closing {
            self.stack.push(name.to_string());
        }
        Ok(())
    }

    fn write_open_tag(&mut self, element: &str, attributes: &[(&str, String)], self_closing: bool) {
        self.out.push('<');
        self.out.push_str(element);
        let mut written: Vec<&str> = Vec::with_capacity(attributes.len());
        for (name, value) in attributes {
            match filter_attribute(name, value) {
                Some(canonical) if !written.contains(&canonical) => {
                    written.push(canonical);
                    self.out.push(' ');
                    self.out.push_str(canonical);
                    self.out.push_str("=\"");
                    self.out.push_str(&escape_xml(value.trim()));
                    self.out.push('"');
                }
                Some(_) => {}
                None => debug!(%element, attribute = %name, "write_open_tag: dropping attribute"),
            }
        }
        self.out.push_str(if self_closing { "/>" } else { ">" });
    }

    fn close_tag(&mut self) -> Result<(), SanitizeError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.read_name().ok_or_else(|| malformed(start, "expected element name"))?;
        self.skip_whitespace();
        if self.peek() != Some('>') {
            return Err(malformed(self.pos, format!("unterminated </{name}> tag")));
        }
        self.pos += 1;

        let Some(open) = self.stack.pop() else {
            return Err(malformed(start, format!("</{name}> has no open element")));
        };
        if open != name {
            return Err(malformed(start, format!("</{name}> closes <{open}>")));
        }

        match self.drop_from {
            Some(depth) if depth == self.stack.len() => self.drop_from = None,
            Some(_) => {}
            None => {
                self.out.push_str("</");
                self.out.push_str(&name.to_ascii_lowercase());
                self.out.push('>');
            }
        }
        Ok(())
    }
}

/// Canonical attribute name when the attribute may be kept
fn filter_attribute(name: &str, value: &str) -> Option<&'static str> {
    let canonical = ALLOWED_ATTRIBUTES.iter().copied().find(|a| a.eq_ignore_ascii_case(name))?;
    if matches!(canonical, "href" | "xlink:href") {
        return is_safe_url(value).then_some(canonical);
    }
    only_fragment_references(value).then_some(canonical)
}

/// Fragment, http(s) or mailto target, ignoring whitespace and control characters
fn is_safe_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with('#') || SAFE_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

/// Every `url(...)` in a presentation value must point inside the document
fn only_fragment_references(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.match_indices("url(").all(|(i, m)| {
        lower[i + m.len()..]
            .trim_start()
            .trim_start_matches(['"', '\''])
            .starts_with('#')
    })
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 12)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
