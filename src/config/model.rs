//! Config data model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default agent command, split with shell-words into program and entry args.
pub const DEFAULT_AGENT_COMMAND: &str = "python3 -m chat_assistant_crew.main";

/// Default supervision window for one agent run.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default reply marker the agent prints before its answer.
pub const DEFAULT_REPLY_MARKER: &str = "assistant:";

/// Default chat-completion endpoint for the fallback path.
pub const DEFAULT_FALLBACK_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default fallback model identifier.
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Replies matching any of these (case-insensitive) are startup noise, not answers.
pub fn default_degenerate_patterns() -> Vec<String> {
    vec![
        r"^initiali[sz]ing\b".to_string(),
        r"^starting\b[^.]*\bassistant\b\W*$".to_string(),
        r"^loading\b".to_string(),
        r"^\.+$".to_string(),
    ]
}

/// Configuration for parley.
///
/// This struct represents the contents of `parley.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External agent process settings.
    pub agent: AgentSettings,

    /// History side-channel settings.
    pub history: HistorySettings,

    /// Callback API the agent may call back into.
    pub backend: BackendSettings,

    /// Direct chat-completion fallback settings.
    pub fallback: FallbackSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Program plus module entry arguments.
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Working directory for the agent process (inherits ours when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Milliseconds before the agent is killed.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Case-insensitive token that introduces the reply in agent stdout.
    #[serde(default = "default_reply_marker")]
    pub reply_marker: String,

    /// Regex patterns marking an extracted reply as degenerate.
    #[serde(default = "default_degenerate_patterns")]
    pub degenerate_patterns: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            working_dir: None,
            timeout_ms: default_timeout_ms(),
            reply_marker: default_reply_marker(),
            degenerate_patterns: default_degenerate_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum number of prior turns written to the side-channel file.
    #[serde(default = "default_side_channel_limit")]
    pub side_channel_limit: usize,

    /// Directory for transient history files (OS temp dir when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            side_channel_limit: default_side_channel_limit(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Explicit base URL override for the callback API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Externally reachable URL of this host, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    /// Port the host API listens on, used for the loopback fallback.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            external_url: None,
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Chat-completion endpoint URL.
    #[serde(default = "default_fallback_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_fallback_model")]
    pub model: String,

    /// Sampling temperature; kept low so answers stay stable.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of prior turns included in the request.
    #[serde(default = "default_fallback_history_limit")]
    pub history_limit: usize,

    /// Overall HTTP timeout for one fallback request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Model API key. Read from config or `OPENAI_API_KEY`; never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            endpoint: default_fallback_endpoint(),
            model: default_fallback_model(),
            temperature: default_temperature(),
            history_limit: default_fallback_history_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

// Default value functions for serde
fn default_agent_command() -> String {
    DEFAULT_AGENT_COMMAND.to_string()
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_reply_marker() -> String {
    DEFAULT_REPLY_MARKER.to_string()
}
fn default_side_channel_limit() -> usize {
    50
}
fn default_port() -> u16 {
    3000
}
fn default_fallback_endpoint() -> String {
    DEFAULT_FALLBACK_ENDPOINT.to_string()
}
fn default_fallback_model() -> String {
    DEFAULT_FALLBACK_MODEL.to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_fallback_history_limit() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
