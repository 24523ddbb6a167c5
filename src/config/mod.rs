// src/config/mod.rs

//! Engine configuration.
//!
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{EngineConfig, EngineSection, LoggingSection, RawEngineConfig};
pub use validate::validate_config;
