//! Markup access for the EAD hierarchy builder.
//!
//! Wraps `roxmltree` in a small typed tree API ([`MarkupNode`]) with
//! relative path queries ([`PathQuery`]) and a [`MarkupReader`] seam that
//! hands the `<dsc>` fragment of an EAD document to the mapping core.

mod node;
mod query;
mod reader;

pub use node::{FRAGMENT_ROOT, MarkupDocument, MarkupNode, NamespaceDecl, wrap_fragment};
pub use query::{PathQuery, QueryMatch};
pub use reader::{DSC_PATH, EadReader, MarkupReader};
