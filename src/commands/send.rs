//! Implementation of the `parley send` command.

use super::read_stdin;
use crate::cli::SendArgs;
use crate::config::Config;
use crate::conversation::{ConversationRequest, PriorTurn, RequestingUser};
use crate::dispatch::Dispatcher;
use crate::error::{ParleyError, Result};
use std::path::Path;

/// Execute the `parley send` command.
///
/// Dispatches one message and prints the reply on stdout.
pub async fn cmd_send(config: &Config, args: SendArgs) -> Result<()> {
    let message = match &args.message {
        Some(message) => message.clone(),
        None => read_stdin("message")?,
    };
    let request = build_request(args, message)?;

    let dispatcher = Dispatcher::from_config(config)?;
    let reply = dispatcher.send_message(&request).await?;

    println!("{}", reply);
    Ok(())
}

fn build_request(args: SendArgs, message: String) -> Result<ConversationRequest> {
    let message = message.trim_end_matches(['\r', '\n']);
    if message.trim().is_empty() {
        return Err(ParleyError::UserError(
            "message is empty.\n\nPass --message <text> or pipe the message on stdin.".to_string(),
        ));
    }

    let mut user = RequestingUser::new(args.user_id);
    if let Some(email) = args.user_email {
        user = user.with_email(email);
    }
    if let Some(name) = args.user_name {
        user = user.with_display_name(name);
    }

    let mut request = ConversationRequest::new(args.client_id, user, message);
    if let Some(path) = &args.history {
        request = request.with_history(load_history(path)?);
    }
    if let Some(token) = args.token.filter(|t| !t.trim().is_empty()) {
        request = request.with_credential(token);
    }

    Ok(request)
}

fn load_history(path: &Path) -> Result<Vec<PriorTurn>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ParleyError::UserError(format!(
            "failed to read history file '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ParleyError::UserError(format!(
            "history file '{}' is not a JSON array of {{role, content}} turns: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use tempfile::TempDir;

    fn args() -> SendArgs {
        SendArgs {
            client_id: "RO123".to_string(),
            user_id: "7".to_string(),
            user_email: None,
            user_name: None,
            message: None,
            history: None,
            token: None,
        }
    }

    #[test]
    fn trailing_newline_from_stdin_is_dropped() {
        let request = build_request(args(), "What is my balance?\n".to_string()).unwrap();
        assert_eq!(request.message(), "What is my balance?");
        assert_eq!(request.client_id(), "RO123");
        assert!(request.credential().is_none());
    }

    #[test]
    fn blank_message_is_rejected() {
        let err = build_request(args(), " \n".to_string()).unwrap_err();
        assert!(matches!(err, ParleyError::UserError(_)));
    }

    #[test]
    fn identity_and_token_are_carried() {
        let mut args = args();
        args.user_email = Some("ana@example.com".to_string());
        args.user_name = Some("Ana Pop".to_string());
        args.token = Some("jwt-abc".to_string());

        let request = build_request(args, "hi".to_string()).unwrap();

        assert_eq!(request.user().display_identity(), "ana@example.com");
        assert_eq!(request.credential(), Some("jwt-abc"));
    }

    #[test]
    fn history_file_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("turns.json");
        std::fs::write(
            &path,
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#,
        )
        .unwrap();
        let mut args = args();
        args.history = Some(path);

        let request = build_request(args, "next".to_string()).unwrap();

        assert_eq!(request.history().len(), 2);
        assert_eq!(request.history()[1].role, Role::Assistant);
    }

    #[test]
    fn malformed_history_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("turns.json");
        std::fs::write(&path, r#"{"role":"user"}"#).unwrap();
        let mut args = args();
        args.history = Some(path);

        let err = build_request(args, "next".to_string()).unwrap_err();

        assert!(err.to_string().contains("turns.json"));
    }

    #[test]
    fn missing_history_file_is_a_user_error() {
        let mut args = args();
        args.history = Some("/nonexistent/parley/turns.json".into());

        let err = build_request(args, "next".to_string()).unwrap_err();

        assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
    }
}
