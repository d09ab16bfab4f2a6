//! Level-mapping engine for EAD component hierarchies.
//!
//! Turns the nested `<c01>`/`<c02>`/... components of an EAD `<dsc>` block
//! into a generic record tree using caller-supplied per-level mappings.

pub mod hierarchy;
pub mod levels;
pub mod refinery;
pub mod template;

pub use hierarchy::{HierarchyMapper, TOP_LEVEL_DEPTH, child_tag_for};
pub use refinery::{
    EadHierarchyRefinery, LEVELS_SETTING, REFINERY_NAME, RefineContext, RefineryInfo,
    RefineryStatus, SettingDescriptor, validate_context,
};
pub use template::{Segment, Template, render};
