//! Config loading, environment overrides, and validation.

use super::model::Config;
use crate::error::{ParleyError, Result};
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "parley.yaml";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ParleyError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| ParleyError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string. The model API key is never included.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            ParleyError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Resolve the effective configuration for this process.
    ///
    /// An explicit path must exist. Without one, `parley.yaml` in the working
    /// directory is used if present, otherwise defaults. Environment overrides
    /// are applied last and the result is validated again.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(program) = get("PYTHON_BIN") {
            let (_, entry_args) = self.agent_argv()?;
            let mut argv = vec![program];
            argv.extend(entry_args);
            self.agent.command = shell_words::join(argv);
        }
        if let Some(raw) = get("CHAT_ASSISTANT_TIMEOUT_MS") {
            self.agent.timeout_ms = raw.trim().parse().map_err(|_| {
                ParleyError::ConfigError(format!(
                    "CHAT_ASSISTANT_TIMEOUT_MS must be a whole number of milliseconds (found '{}')",
                    raw
                ))
            })?;
        }
        if let Some(dir) = get("CHAT_ASSISTANT_CWD") {
            self.agent.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = get("BACKEND_API_URL") {
            self.backend.api_base_url = Some(url);
        }
        if let Some(url) = get("RENDER_EXTERNAL_URL") {
            self.backend.external_url = Some(url);
        }
        if let Some(raw) = get("PORT") {
            self.backend.port = raw.trim().parse().map_err(|_| {
                ParleyError::ConfigError(format!("PORT must be a valid port number (found '{}')", raw))
            })?;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.fallback.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.fallback.model = model;
        }

        Ok(())
    }

    /// Validate config values and return error on invalid values.
    pub fn validate(&self) -> Result<()> {
        if self.agent.timeout_ms == 0 {
            return Err(ParleyError::ConfigError(
                "agent.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.agent.reply_marker.trim().is_empty() {
            return Err(ParleyError::ConfigError(
                "agent.reply_marker must not be empty".to_string(),
            ));
        }

        self.agent_argv()?;
        self.degenerate_regexes()?;

        if self.history.side_channel_limit == 0 {
            return Err(ParleyError::ConfigError(
                "history.side_channel_limit must be greater than 0".to_string(),
            ));
        }

        if self.backend.port == 0 {
            return Err(ParleyError::ConfigError(
                "backend.port must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.fallback.temperature) {
            return Err(ParleyError::ConfigError(format!(
                "fallback.temperature must be between 0 and 2 (found {})",
                self.fallback.temperature
            )));
        }

        if self.fallback.history_limit == 0 {
            return Err(ParleyError::ConfigError(
                "fallback.history_limit must be greater than 0".to_string(),
            ));
        }

        if self.fallback.request_timeout_secs == 0 {
            return Err(ParleyError::ConfigError(
                "fallback.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.fallback.endpoint.trim().is_empty() {
            return Err(ParleyError::ConfigError(
                "fallback.endpoint must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Split `agent.command` into the program and its module entry arguments.
    pub fn agent_argv(&self) -> Result<(String, Vec<String>)> {
        let mut args = shell_words::split(&self.agent.command).map_err(|e| {
            ParleyError::ConfigError(format!(
                "failed to parse agent.command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.agent.command, e
            ))
        })?;

        if args.is_empty() {
            return Err(ParleyError::ConfigError(
                "agent.command must name a program to run".to_string(),
            ));
        }

        let program = args.remove(0);
        Ok((program, args))
    }

    /// Supervision window for one agent run.
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent.timeout_ms)
    }

    /// Compile `agent.degenerate_patterns` case-insensitively.
    pub fn degenerate_regexes(&self) -> Result<Vec<Regex>> {
        self.agent
            .degenerate_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ParleyError::ConfigError(format!(
                            "agent.degenerate_patterns entry '{}' is not a valid regex: {}",
                            pattern, e
                        ))
                    })
            })
            .collect()
    }

    /// Directory for transient history files.
    pub fn scratch_dir(&self) -> PathBuf {
        self.history
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Whether a model key is available for the fallback path.
    pub fn has_fallback_credential(&self) -> bool {
        self.fallback
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
