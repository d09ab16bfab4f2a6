//! Core domain types: per-level mappings and the nested output record tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name under which the preferred label template is rendered.
pub const PREFERRED_LABELS_FIELD: &str = "preferred_labels";

/// Subfield of [`PREFERRED_LABELS_FIELD`] holding the rendered label.
pub const PREFERRED_LABEL_NAME: &str = "name";

// ---------------------------------------------------------------------------
// Level configuration
// ---------------------------------------------------------------------------

/// Per-level configuration, keyed by the markup `level` attribute value.
pub type LevelConfig = BTreeMap<String, LevelMapping>;

/// How nodes of one archival level map onto a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMapping {
    /// Target entity table (e.g. `ca_collections`).
    pub table: String,
    /// Target entity type (e.g. `series`).
    #[serde(rename = "type")]
    pub type_: String,
    /// Template for `preferred_labels.name`.
    #[serde(
        default,
        rename = "preferredLabel",
        alias = "preferredLabelTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_label: Option<String>,
    /// Field templates, either leaf fields or subfield containers.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeTemplate>,
}

/// A configured field: a single template, or a container of subfield templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeTemplate {
    Field(String),
    Container(BTreeMap<String, String>),
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A rendered field value on an [`OutputRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Container(BTreeMap<String, String>),
}

/// One node of the generated import tree.
///
/// `table` and `type` are only set when the source node's level matched a
/// configured [`LevelMapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Rendered fields, flattened into the record alongside `table`/`type`.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Mapped child components in document order.
    #[serde(default)]
    pub children: Vec<OutputRecord>,
}

impl OutputRecord {
    /// Look up a leaf field's rendered text.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Text(s) => Some(s),
            FieldValue::Container(_) => None,
        }
    }

    /// Look up a container subfield's rendered text.
    pub fn subfield(&self, field: &str, subfield: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Container(map) => map.get(subfield).map(String::as_str),
            FieldValue::Text(_) => None,
        }
    }

    /// Shorthand for `preferred_labels.name`.
    pub fn preferred_label(&self) -> Option<&str> {
        self.subfield(PREFERRED_LABELS_FIELD, PREFERRED_LABEL_NAME)
    }

    /// Whether the record was produced from a configured level.
    pub fn is_mapped(&self) -> bool {
        self.table.is_some()
    }
}

/// Value handed back to the host import pipeline: `{ "children": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineOutput {
    pub children: Vec<OutputRecord>,
}
