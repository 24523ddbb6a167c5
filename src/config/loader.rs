// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::Result;

/// Load an engine config file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Parse engine config TOML from a string.
pub fn parse_str(contents: &str) -> Result<RawEngineConfig> {
    let config: RawEngineConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Load an engine config file and validate it.
///
/// This is the recommended entry point: it reads TOML, applies defaults
/// (handled by `serde` + `Default` impls), and rejects zero capacities.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw = load_from_path(path)?;
    EngineConfig::try_from(raw)
}

/// Default config location: `Recipeflow.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Recipeflow.toml")
}
