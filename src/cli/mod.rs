//! CLI argument parsing for parley.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Parley: send one chat message through an external agent, with a model
/// fallback when the agent has nothing usable to say.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to ./parley.yaml when present).
    #[arg(long, global = true, env = "PARLEY_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for parley.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message and print the reply.
    ///
    /// Runs the configured agent once under the timeout; falls back to the
    /// chat-completion endpoint when it fails.
    Send(SendArgs),

    /// Extract the reply from captured agent output.
    ///
    /// Reads the file (or stdin) and prints what the dispatcher would take as
    /// the agent's reply. Exits with 1 when there is none.
    Extract(ExtractArgs),

    /// Print the effective configuration as YAML.
    ///
    /// Includes environment overrides. The model API key is never printed.
    Config,
}

/// Arguments for the `send` command.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Client the conversation is about.
    #[arg(long, value_name = "ID")]
    pub client_id: String,

    /// Id of the user sending the message.
    #[arg(long, value_name = "ID")]
    pub user_id: String,

    /// User's email, shown to the model.
    #[arg(long, value_name = "EMAIL")]
    pub user_email: Option<String>,

    /// User's display name, shown to the model when there is no email.
    #[arg(long, value_name = "NAME")]
    pub user_name: Option<String>,

    /// Message text (read from stdin when omitted).
    #[arg(short, long)]
    pub message: Option<String>,

    /// JSON file with prior turns: `[{"role": "user", "content": "..."}]`.
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Caller's bearer token, forwarded to the agent.
    #[arg(long, env = "PARLEY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Arguments for the `extract` command.
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Reply marker (defaults to the configured one).
    #[arg(long)]
    pub marker: Option<String>,

    /// File with captured stdout (reads stdin when omitted).
    pub file: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_send_minimal() {
        let cli = Cli::try_parse_from([
            "parley",
            "send",
            "--client-id",
            "RO123",
            "--user-id",
            "7",
            "--message",
            "What is my balance?",
        ])
        .unwrap();

        assert!(!cli.verbose);
        if let Command::Send(args) = cli.command {
            assert_eq!(args.client_id, "RO123");
            assert_eq!(args.user_id, "7");
            assert_eq!(args.message.as_deref(), Some("What is my balance?"));
            assert!(args.history.is_none());
            assert!(args.user_email.is_none());
        } else {
            panic!("Expected Send command");
        }
    }

    #[test]
    fn parse_send_full() {
        let cli = Cli::try_parse_from([
            "parley",
            "--config",
            "custom.yaml",
            "-v",
            "send",
            "--client-id",
            "RO123",
            "--user-id",
            "7",
            "--user-email",
            "ana@example.com",
            "--user-name",
            "Ana Pop",
            "--history",
            "turns.json",
            "--token",
            "jwt-abc",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        if let Command::Send(args) = cli.command {
            assert_eq!(args.user_email.as_deref(), Some("ana@example.com"));
            assert_eq!(args.user_name.as_deref(), Some("Ana Pop"));
            assert_eq!(args.history, Some(PathBuf::from("turns.json")));
            assert_eq!(args.token.as_deref(), Some("jwt-abc"));
            assert!(args.message.is_none());
        } else {
            panic!("Expected Send command");
        }
    }

    #[test]
    fn send_requires_client_and_user() {
        assert!(Cli::try_parse_from(["parley", "send", "--user-id", "7"]).is_err());
        assert!(Cli::try_parse_from(["parley", "send", "--client-id", "RO1"]).is_err());
    }

    #[test]
    fn parse_extract() {
        let cli = Cli::try_parse_from(["parley", "extract", "--marker", "Bot:", "out.txt"]).unwrap();
        if let Command::Extract(args) = cli.command {
            assert_eq!(args.marker.as_deref(), Some("Bot:"));
            assert_eq!(args.file, Some(PathBuf::from("out.txt")));
        } else {
            panic!("Expected Extract command");
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["parley", "config", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Config));
    }
}
