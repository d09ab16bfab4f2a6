//! Typed wrappers over a parsed XML tree.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use eadhier_shared::{EadHierError, Result};

use crate::query::{PathQuery, QueryMatch};

/// Tag of the synthetic root that wraps an extracted `<dsc>` fragment.
pub const FRAGMENT_ROOT: &str = "subcollections";

/// A namespace declaration carried over when a fragment is re-parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Prefix, or `None` for the default namespace.
    pub prefix: Option<String>,
    pub uri: String,
}

// ---------------------------------------------------------------------------
// MarkupDocument
// ---------------------------------------------------------------------------

/// A parsed markup document borrowing its source text.
pub struct MarkupDocument<'input> {
    doc: Document<'input>,
}

impl<'input> MarkupDocument<'input> {
    /// Parse a complete XML document. DTDs are accepted (EAD files usually carry one).
    pub fn parse(xml: &'input str) -> Result<Self> {
        let opts = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, opts)
            .map_err(|e| EadHierError::parse(e.to_string()))?;
        debug!(nodes = doc.descendants().count(), "parsed markup document");
        Ok(Self { doc })
    }

    /// The document element.
    pub fn root(&self) -> MarkupNode<'_, 'input> {
        MarkupNode::new(self.doc.root_element())
    }
}

/// Wrap a markup fragment in a standalone `<subcollections>` document.
///
/// Namespace declarations in scope at the fragment's origin are re-declared
/// on the wrapper so prefixed tags inside the fragment still resolve.
pub fn wrap_fragment(fragment: &str, namespaces: &[NamespaceDecl]) -> String {
    let mut out = String::with_capacity(fragment.len() + 64);
    out.push('<');
    out.push_str(FRAGMENT_ROOT);
    for ns in namespaces {
        match &ns.prefix {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape_attr(&ns.uri));
        out.push('"');
    }
    out.push('>');
    out.push_str(fragment);
    out.push_str("</");
    out.push_str(FRAGMENT_ROOT);
    out.push('>');
    out
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// MarkupNode
// ---------------------------------------------------------------------------

/// A node in a parsed markup tree.
///
/// Accessors are always present: absent attributes come back as `None` and
/// child lookups as possibly-empty sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupNode<'a, 'input> {
    node: Node<'a, 'input>,
}

impl<'a, 'input> MarkupNode<'a, 'input> {
    pub(crate) fn new(node: Node<'a, 'input>) -> Self {
        Self { node }
    }

    pub(crate) fn raw(&self) -> Node<'a, 'input> {
        self.node
    }

    /// Local tag name (namespace prefix dropped). Empty for non-element nodes.
    pub fn tag_name(&self) -> &'a str {
        if self.node.is_element() {
            self.node.tag_name().name()
        } else {
            ""
        }
    }

    pub fn is_element(&self) -> bool {
        self.node.is_element()
    }

    /// Attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node
            .attributes()
            .find(|attr| attr.name() == name)
            .map(|attr| attr.value())
    }

    /// The archival `level` attribute.
    pub fn level(&self) -> Option<&'a str> {
        self.attribute("level")
    }

    /// All element children, in document order.
    pub fn children(&self) -> impl Iterator<Item = MarkupNode<'a, 'input>> + use<'a, 'input> {
        self.node
            .children()
            .filter(|n| n.is_element())
            .map(MarkupNode::new)
    }

    /// Element children with the given local tag name, in document order.
    pub fn children_with_tag(&self, name: &str) -> Vec<MarkupNode<'a, 'input>> {
        self.children().filter(|c| c.tag_name() == name).collect()
    }

    /// Concatenated text of this node and all its descendants.
    pub fn text(&self) -> String {
        self.node
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect()
    }

    /// Evaluate a relative path query rooted at this node.
    pub fn query(&self, path: &str) -> Result<Vec<QueryMatch<'a, 'input>>> {
        let query = PathQuery::parse(path)?;
        Ok(query.evaluate(*self))
    }

    /// Text of the first match of `path`, if any.
    pub fn first_text(&self, path: &str) -> Result<Option<String>> {
        Ok(self.query(path)?.first().map(QueryMatch::text))
    }

    /// Source markup between this element's start and end tags.
    pub fn inner_markup(&self) -> &'input str {
        let source = self.node.document().input_text();
        let mut children = self.node.children();
        match (children.next(), self.node.last_child()) {
            (Some(first), Some(last)) => &source[first.range().start..last.range().end],
            _ => "",
        }
    }

    /// Namespace declarations in scope at this element.
    pub fn namespaces(&self) -> Vec<NamespaceDecl> {
        self.node
            .namespaces()
            .filter(|ns| ns.uri() != "http://www.w3.org/XML/1998/namespace")
            .map(|ns| NamespaceDecl {
                prefix: ns.name().map(str::to_string),
                uri: ns.uri().to_string(),
            })
            .collect()
    }
}
