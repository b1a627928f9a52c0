//! Implementation of the `parley config` command.

use crate::config::Config;
use crate::error::Result;

/// Execute the `parley config` command.
///
/// Prints the effective configuration, including whether a model key is set.
pub fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    println!(
        "# fallback api key: {}",
        if config.has_fallback_credential() {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}
