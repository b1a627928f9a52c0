//! Implementation of the `parley extract` command.

use super::read_stdin;
use crate::agent::{Extraction, ReplyExtractor};
use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{ParleyError, Result};

/// Execute the `parley extract` command.
pub fn cmd_extract(config: &Config, args: ExtractArgs) -> Result<()> {
    let output = match &args.file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            ParleyError::UserError(format!("failed to read '{}': {}", path.display(), e))
        })?,
        None => read_stdin("agent output")?,
    };

    let reply = extract_reply(config, args.marker.as_deref(), &output)?;
    println!("{}", reply);
    Ok(())
}

fn extract_reply(config: &Config, marker: Option<&str>, output: &str) -> Result<String> {
    let extractor = match marker {
        Some(marker) if !marker.trim().is_empty() => {
            ReplyExtractor::new(marker, config.degenerate_regexes()?)
        }
        Some(_) => return Err(ParleyError::UserError("--marker must not be empty".to_string())),
        None => ReplyExtractor::from_config(config)?,
    };

    match extractor.extract(output) {
        Extraction::Reply(reply) => Ok(reply),
        Extraction::NotFound => Err(ParleyError::UserError(format!(
            "no '{}' line found in the output",
            extractor.marker()
        ))),
        Extraction::Degenerate(reply) => Err(ParleyError::UserError(format!(
            "reply '{}' is startup noise, not an answer",
            reply
        ))),
    }
}
