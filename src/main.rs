//! Parley CLI entry point.
//!
//! Parses arguments, sets up logging, dispatches to the command handler, and
//! maps errors to exit codes.

use parley::cli::Cli;
use parley::{commands, exit_codes, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    match commands::dispatch(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
