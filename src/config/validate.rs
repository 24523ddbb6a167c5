// src/config/validate.rs

use crate::config::model::{EngineConfig, EngineSection, RawEngineConfig};
use crate::errors::{RecipeflowError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = RecipeflowError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_engine_section(&raw.engine)?;
        Ok(EngineConfig::new_unchecked(raw.engine, raw.logging))
    }
}

/// Check an already-built config again (e.g. one assembled in code).
pub fn validate_config(cfg: &EngineConfig) -> Result<()> {
    validate_engine_section(&cfg.engine)
}

fn validate_engine_section(engine: &EngineSection) -> Result<()> {
    let capacities = [
        ("queue_capacity", engine.queue_capacity),
        ("instance_queue_capacity", engine.instance_queue_capacity),
        ("event_capacity", engine.event_capacity),
        ("finished_history", engine.finished_history),
    ];

    for (key, value) in capacities {
        if value == 0 {
            return Err(RecipeflowError::Config(format!(
                "[engine].{key} must be >= 1 (got 0)"
            )));
        }
    }

    Ok(())
}
