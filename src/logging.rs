//! Tracing setup for the `parley` binary.
//!
//! Logs go to stderr so stdout carries nothing but the reply.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a plain level (`debug`, `warn`, `silent`, ...).
pub const LOG_LEVEL_ENV: &str = "PARLEY_LOG_LEVEL";

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = log_filter(
        std::env::var("RUST_LOG").ok(),
        std::env::var(LOG_LEVEL_ENV).ok(),
        verbose,
    );

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_filter(rust_log: Option<String>, level: Option<String>, verbose: bool) -> EnvFilter {
    EnvFilter::try_new(filter_directive(rust_log, level, verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn filter_directive(rust_log: Option<String>, level: Option<String>, verbose: bool) -> String {
    if let Some(directive) = rust_log.filter(|v| !v.trim().is_empty()) {
        return directive;
    }

    if let Some(level) = level.filter(|v| !v.trim().is_empty()) {
        return match level.trim().to_ascii_lowercase().as_str() {
            "silent" => "off".to_string(),
            "fatal" => "error".to_string(),
            other => other.to_string(),
        };
    }

    if verbose { "debug" } else { "info" }.to_string()
}
