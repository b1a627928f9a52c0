//! Error types for parley.
//!
//! Two layers live here:
//!
//! - [`DispatchFailure`] is the taxonomy of expected failures on the way to a
//!   reply. Every variant is recovered inside the dispatcher, either by the
//!   fallback responder or by a fixed user-facing message.
//! - [`ParleyError`] is what actually crosses a public boundary, with an exit
//!   code for the CLI.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// User provided invalid arguments or unreadable input.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be read or failed validation.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The dispatcher could not produce any reply.
    ///
    /// Only raised when the fallback request itself cannot be constructed.
    #[error("Dispatch failed: {0}")]
    DispatchError(String),
}

impl ParleyError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParleyError::UserError(_) => exit_codes::USER_ERROR,
            ParleyError::ConfigError(_) => exit_codes::USER_ERROR,
            ParleyError::DispatchError(_) => exit_codes::DISPATCH_FAILURE,
        }
    }
}

/// Result type alias for parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;

/// Why a dispatch path did not yield a usable reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// The agent executable could not be launched.
    #[error("failed to launch agent '{program}': {message}")]
    SpawnFailure { program: String, message: String },

    /// The agent did not exit within the supervision window and was killed.
    #[error("agent timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// The agent exited with a failure status.
    #[error("agent exited with {}", describe_exit(*code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// The agent exited cleanly but no usable reply could be extracted.
    #[error("no usable reply in agent output: {reason}")]
    ExtractionFailure { reason: String },

    /// No model credential is configured for the fallback path.
    #[error("fallback model credential is not configured")]
    FallbackUnconfigured,

    /// The fallback endpoint answered with a non-success status or not at all.
    #[error("fallback request failed: {message}")]
    FallbackHttpFailure {
        status: Option<u16>,
        message: String,
    },
}

impl DispatchFailure {
    /// Whether the dispatcher should hand this failure to the fallback responder.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            DispatchFailure::SpawnFailure { .. }
                | DispatchFailure::Timeout { .. }
                | DispatchFailure::NonZeroExit { .. }
                | DispatchFailure::ExtractionFailure { .. }
        )
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
