// src/config/model.rs

use serde::Deserialize;

use crate::types::LogLevel;

/// Engine configuration as read from a TOML file.
///
/// ```toml
/// [engine]
/// queue_capacity = 64
/// instance_queue_capacity = 32
/// event_capacity = 256
/// finished_history = 1024
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub logging: LoggingSection,
}

/// Config as deserialized, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl EngineConfig {
    /// Construct without running validation. Callers are responsible for
    /// having validated the sections.
    pub(crate) fn new_unchecked(engine: EngineSection, logging: LoggingSection) -> Self {
        Self { engine, logging }
    }
}

/// `[engine]` section: channel sizes and retention of the async runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineSection {
    /// Capacity of the router's event channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of each recipe actor's channel.
    #[serde(default = "default_instance_queue_capacity")]
    pub instance_queue_capacity: usize,

    /// Capacity of the node event broadcast channel. Slow subscribers lag
    /// rather than block the engine.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// How many finished recipes stay available for snapshots and
    /// supersession once their actor has been retired. Oldest go first.
    #[serde(default = "default_finished_history")]
    pub finished_history: usize,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_instance_queue_capacity() -> usize {
    32
}

fn default_event_capacity() -> usize {
    256
}

fn default_finished_history() -> usize {
    1024
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            instance_queue_capacity: default_instance_queue_capacity(),
            event_capacity: default_event_capacity(),
            finished_history: default_finished_history(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct LoggingSection {
    /// If `None`, `RECIPEFLOW_LOG` or the `info` default applies.
    #[serde(default)]
    pub level: Option<LogLevel>,
}
