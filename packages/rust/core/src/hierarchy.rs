//! Recursive mapping of nested `<cNN>` components into an import record tree.
//!
//! Child components are discovered by a tag name computed from depth
//! (`c01`, `c02`, ...), not by walking every child element. Depth is passed
//! by value into each recursive call, so siblings always see their own depth.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use eadhier_markup::MarkupNode;
use eadhier_shared::{
    AttributeTemplate, FieldValue, LevelConfig, LevelMapping, OutputRecord, PREFERRED_LABEL_NAME,
    PREFERRED_LABELS_FIELD,
};

use crate::levels;
use crate::template::render;

/// Depth of the components directly under `<dsc>`.
pub const TOP_LEVEL_DEPTH: u32 = 1;

/// Tag name of components at `depth`: `c` followed by a two-digit depth.
pub fn child_tag_for(depth: u32) -> String {
    format!("c{depth:02}")
}

/// Maps component nodes to [`OutputRecord`]s using a level configuration.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyMapper<'c> {
    config: &'c LevelConfig,
}

impl<'c> HierarchyMapper<'c> {
    pub fn new(config: &'c LevelConfig) -> Self {
        Self { config }
    }

    /// Map every element child of `root` at [`TOP_LEVEL_DEPTH`].
    #[instrument(skip_all, fields(levels = self.config.len()))]
    pub fn map_forest(&self, root: MarkupNode<'_, '_>) -> Vec<OutputRecord> {
        let forest: Vec<OutputRecord> = root
            .children()
            .map(|child| self.map(child, TOP_LEVEL_DEPTH))
            .collect();
        debug!(
            top_level = forest.len(),
            total = forest.iter().map(count_records).sum::<usize>(),
            unmapped = forest.iter().map(count_unmapped).sum::<usize>(),
            "mapped component hierarchy"
        );
        forest
    }

    /// Map `node`, sitting at `depth`, and its `c{depth+1}` descendants.
    ///
    /// Unconfigured levels still yield a record (without `table`/`type`) so
    /// their children are not lost.
    pub fn map(&self, node: MarkupNode<'_, '_>, depth: u32) -> OutputRecord {
        let mut record = match levels::resolve(&node, self.config) {
            Some(mapping) => apply_mapping(mapping, node),
            None => {
                trace!(tag = node.tag_name(), level = node.level(), depth, "unmapped level");
                OutputRecord::default()
            }
        };

        let child_depth = depth + 1;
        let child_tag = child_tag_for(child_depth);
        record.children = node
            .children_with_tag(&child_tag)
            .into_iter()
            .map(|child| self.map(child, child_depth))
            .collect();

        record
    }
}

fn apply_mapping(mapping: &LevelMapping, node: MarkupNode<'_, '_>) -> OutputRecord {
    let mut fields = BTreeMap::new();

    for (field, template) in &mapping.attributes {
        let value = match template {
            AttributeTemplate::Field(t) => FieldValue::Text(render(t, node)),
            AttributeTemplate::Container(subfields) => FieldValue::Container(
                subfields
                    .iter()
                    .map(|(subfield, t)| (subfield.clone(), render(t, node)))
                    .collect(),
            ),
        };
        fields.insert(field.clone(), value);
    }

    if let Some(label_template) = &mapping.preferred_label {
        let name = render(label_template, node);
        let labels = fields
            .entry(PREFERRED_LABELS_FIELD.to_string())
            .or_insert_with(|| FieldValue::Container(BTreeMap::new()));
        match labels {
            FieldValue::Container(subfields) => {
                subfields.insert(PREFERRED_LABEL_NAME.to_string(), name);
            }
            other => {
                *other = FieldValue::Container(BTreeMap::from([(
                    PREFERRED_LABEL_NAME.to_string(),
                    name,
                )]));
            }
        }
    }

    trace!(
        tag = node.tag_name(),
        level = node.level(),
        table = %mapping.table,
        type_ = %mapping.type_,
        "mapped component"
    );

    OutputRecord {
        table: Some(mapping.table.clone()),
        type_: Some(mapping.type_.clone()),
        fields,
        children: Vec::new(),
    }
}

fn count_records(record: &OutputRecord) -> usize {
    1 + record.children.iter().map(count_records).sum::<usize>()
}

fn count_unmapped(record: &OutputRecord) -> usize {
    usize::from(!record.is_mapped()) + record.children.iter().map(count_unmapped).sum::<usize>()
}
