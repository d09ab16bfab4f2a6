//! Source readers that hand markup fragments to the mapping core.

use std::path::Path;

use tracing::{debug, warn};

use eadhier_shared::{EadHierError, Result};

use crate::node::{MarkupDocument, MarkupNode, NamespaceDecl};
use crate::query::QueryMatch;

/// Path of the component list inside an EAD document.
pub const DSC_PATH: &str = "/archdesc/dsc";

/// Read access to a source document, addressed by path.
pub trait MarkupReader {
    /// Inner markup of the first element matched by `path`, relative to the
    /// document element. `None` when nothing matches.
    fn get(&self, path: &str) -> Option<String>;

    /// Namespace declarations in scope at the element matched by `path`.
    fn namespaces(&self, _path: &str) -> Vec<NamespaceDecl> {
        Vec::new()
    }

    /// Inner markup and in-scope namespaces of the element matched by `path`.
    ///
    /// Readers backed by a parsed document should override this to answer
    /// both from a single lookup.
    fn fragment(&self, path: &str) -> Option<(String, Vec<NamespaceDecl>)> {
        let markup = self.get(path)?;
        Some((markup, self.namespaces(path)))
    }
}

/// Reader over a complete EAD finding aid held in memory.
#[derive(Debug, Clone)]
pub struct EadReader {
    source: String,
}

impl EadReader {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read an EAD file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| EadHierError::io(path, e))?;
        debug!(?path, bytes = source.len(), "read EAD source");
        Ok(Self::new(source))
    }

    /// Parse the source and run `f` against the first element matching `path`.
    fn with_element<T>(
        &self,
        path: &str,
        f: impl FnOnce(MarkupNode<'_, '_>) -> T,
    ) -> Result<Option<T>> {
        let doc = MarkupDocument::parse(&self.source)?;
        let matches = doc.root().query(path)?;
        let element = matches.into_iter().find_map(|m| match m {
            QueryMatch::Node(node) if node.is_element() => Some(node),
            _ => None,
        });
        Ok(element.map(f))
    }
}

impl MarkupReader for EadReader {
    fn get(&self, path: &str) -> Option<String> {
        match self.with_element(path, |node| node.inner_markup().to_string()) {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(path, error = %e, "could not read fragment from EAD source");
                None
            }
        }
    }

    fn namespaces(&self, path: &str) -> Vec<NamespaceDecl> {
        self.with_element(path, |node| node.namespaces())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn fragment(&self, path: &str) -> Option<(String, Vec<NamespaceDecl>)> {
        let found = self.with_element(path, |node| {
            (node.inner_markup().to_string(), node.namespaces())
        });
        match found {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(path, error = %e, "could not read fragment from EAD source");
                None
            }
        }
    }
}
