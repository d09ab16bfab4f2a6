//! Shared types, error model, and configuration for the EAD hierarchy builder.
//!
//! This crate is the foundation depended on by all other crates in the workspace.
//! It provides:
//! - [`EadHierError`], the unified error type
//! - Domain types ([`LevelMapping`], [`OutputRecord`], [`RefineOutput`])
//! - Configuration ([`AppConfig`], level-mapping loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_DESTINATION, DefaultsConfig, ROOT_ENTITY_TABLE, config_dir,
    config_file_path, init_config, load_config, load_config_from, load_levels_from,
    parse_levels_setting,
};
pub use error::{EadHierError, Result};
pub use types::{
    AttributeTemplate, FieldValue, LevelConfig, LevelMapping, OutputRecord, PREFERRED_LABEL_NAME,
    PREFERRED_LABELS_FIELD, RefineOutput,
};
