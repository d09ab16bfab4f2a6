//! Per-level mapping lookup.

use eadhier_markup::MarkupNode;
use eadhier_shared::{LevelConfig, LevelMapping};

/// The mapping configured for `node`'s `level` attribute.
///
/// `None` when the node has no `level` or the level is not configured; that
/// is the normal case for structural components without their own entity.
pub fn resolve<'c>(node: &MarkupNode<'_, '_>, config: &'c LevelConfig) -> Option<&'c LevelMapping> {
    config.get(node.level()?)
}
