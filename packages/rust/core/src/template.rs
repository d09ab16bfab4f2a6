//! Field templates with `^path` placeholders.
//!
//! A template such as `"^did/unitid: ^did/unittitle"` is tokenized into
//! literal and placeholder segments. Rendering resolves each distinct
//! placeholder path once against a markup node (first match wins, no match
//! renders as the empty string) and joins the segments.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{trace, warn};

use eadhier_markup::MarkupNode;

/// Matches `^` followed by path characters, `()` and bracketed predicates.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\^((?:[A-Za-z0-9_\-.:/@*]|\(\)|\[[^\]]*\])+)").expect("placeholder regex")
});

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Path as written after the `^`.
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Tokenize a template string. Never fails: text that is not a
    /// placeholder is kept as a literal.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut cursor = 0;

        for caps in PLACEHOLDER_RE.captures_iter(source) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            literal.push_str(&source[cursor..whole.start()]);

            let (path, trailing) = split_trailing_punctuation(path.as_str());
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(path.to_string()));
            literal.push_str(trailing);
            cursor = whole.end();
        }

        literal.push_str(&source[cursor..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct placeholder paths in order of first appearance.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(path) = segment {
                if !paths.contains(&path.as_str()) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Substitute every placeholder with the first match of its path under `node`.
    pub fn render(&self, node: MarkupNode<'_, '_>) -> String {
        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    let value = resolved
                        .entry(path.as_str())
                        .or_insert_with(|| resolve(path, node));
                    out.push_str(value);
                }
            }
        }

        out
    }
}

/// Parse and render `template` against `node` in one go.
pub fn render(template: &str, node: MarkupNode<'_, '_>) -> String {
    Template::parse(template).render(node)
}

/// Text of the first match of `path`; empty when nothing matches or the
/// path is rejected by the evaluator.
fn resolve(path: &str, node: MarkupNode<'_, '_>) -> String {
    match node.first_text(path) {
        Ok(Some(text)) => {
            trace!(path, value = %text, "resolved placeholder");
            text
        }
        Ok(None) => String::new(),
        Err(e) => {
            warn!(path, error = %e, "placeholder path rejected, rendering as empty");
            String::new()
        }
    }
}

/// `"unittitle."` reads as the path `unittitle` followed by a full stop.
fn split_trailing_punctuation(path: &str) -> (&str, &str) {
    let mut end = path.len();
    while end > 1 {
        let bytes = path.as_bytes();
        let last = bytes[end - 1];
        let before = bytes[end - 2];
        let name_char = before.is_ascii_alphanumeric() || matches!(before, b'_' | b']' | b')');
        if matches!(last, b'.' | b':') && name_char {
            end -= 1;
        } else {
            break;
        }
    }
    path.split_at(end)
}
