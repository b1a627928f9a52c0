//! Conversation request model.
//!
//! A [`ConversationRequest`] is everything the dispatcher knows about one chat
//! message: who is asking, on behalf of which client, what they said, and a
//! bounded slice of what was said before. It is immutable once built.

use serde::{Deserialize, Serialize};

/// Speaker of a prior turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One earlier message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorTurn {
    pub role: Role,
    pub content: String,
}

impl PriorTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The authenticated user the message is sent on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestingUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RequestingUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Identity shown to the model: email, then display name, then id.
    pub fn display_identity(&self) -> &str {
        [self.email.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// A single chat message to answer.
#[derive(Debug, Clone)]
pub struct ConversationRequest {
    client_id: String,
    user: RequestingUser,
    message: String,
    history: Vec<PriorTurn>,
    credential: Option<String>,
}

impl ConversationRequest {
    pub fn new(
        client_id: impl Into<String>,
        user: RequestingUser,
        message: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            user,
            message: message.into(),
            history: Vec::new(),
            credential: None,
        }
    }

    pub fn with_history(mut self, history: Vec<PriorTurn>) -> Self {
        self.history = history;
        self
    }

    /// Attach the caller's bearer token, forwarded to the agent process.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn user(&self) -> &RequestingUser {
        &self.user
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn history(&self) -> &[PriorTurn] {
        &self.history
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// The last `limit` turns in original order. Older turns are dropped.
    pub fn recent_turns(&self, limit: usize) -> &[PriorTurn] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }
}
