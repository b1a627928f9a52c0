//! Command implementations for parley.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod config_cmd;
mod extract;
mod send;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::{ParleyError, Result};
use std::io::Read;

/// Dispatch a command to its implementation.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Send(args) => send::cmd_send(&config, args).await,
        Command::Extract(args) => extract::cmd_extract(&config, args),
        Command::Config => config_cmd::cmd_config(&config),
    }
}

/// Read all of stdin as text, for commands that take their input there.
fn read_stdin(what: &str) -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| ParleyError::UserError(format!("failed to read {} from stdin: {}", what, e)))?;
    Ok(buf)
}
