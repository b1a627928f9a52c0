//! Configuration model for parley.
//!
//! This module defines the Config struct that represents `parley.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for every field, environment overrides, and validation.

mod model;
mod operations;


// Re-export public API
pub use model::{
    AgentSettings, BackendSettings, Config, DEFAULT_AGENT_COMMAND, DEFAULT_FALLBACK_ENDPOINT,
    DEFAULT_FALLBACK_MODEL, DEFAULT_REPLY_MARKER, DEFAULT_TIMEOUT_MS, FallbackSettings,
    HistorySettings, default_degenerate_patterns,
};
pub use operations::DEFAULT_CONFIG_FILE;
