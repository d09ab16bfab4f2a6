//! Application configuration for the EAD hierarchy builder.
//!
//! User config lives at `~/.eadhier/eadhier.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EadHierError, Result};
use crate::types::LevelConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "eadhier.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".eadhier";

/// Import target the refinery must be bound to.
pub const DEFAULT_DESTINATION: &str = "ca_collections._children";

/// Entity table the import mapping must target.
pub const ROOT_ENTITY_TABLE: &str = "ca_collections";

// ---------------------------------------------------------------------------
// Config structs (matching eadhier.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Per-level mappings keyed by `level` attribute value.
    #[serde(default)]
    pub levels: LevelConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Destination the refinery is invoked for.
    #[serde(default = "default_destination")]
    pub destination: String,

    /// Entity table of the bound import mapping, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_table: Option<String>,

    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            bound_table: None,
            pretty: true,
        }
    }
}

fn default_destination() -> String {
    DEFAULT_DESTINATION.into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.eadhier/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EadHierError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.eadhier/eadhier.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EadHierError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EadHierError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EadHierError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config)?;

    std::fs::write(&path, content).map_err(|e| EadHierError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Level mappings
// ---------------------------------------------------------------------------

/// Load a standalone level configuration file.
///
/// `.json` files are read as JSON; anything else as TOML.
pub fn load_levels_from(path: &Path) -> Result<LevelConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EadHierError::io(path, e))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let levels: LevelConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| {
            EadHierError::serialization(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        toml::from_str(&content).map_err(|e| {
            EadHierError::serialization(format!("failed to parse {}: {e}", path.display()))
        })?
    };

    tracing::debug!(?path, levels = levels.len(), "loaded level mappings");
    Ok(levels)
}

/// Parse the free-form level setting the host stores as a JSON string.
pub fn parse_levels_setting(setting: &str) -> Result<LevelConfig> {
    serde_json::from_str(setting).map_err(|e| {
        EadHierError::serialization(format!("invalid level mappings setting: {e}"))
    })
}
