//! Direct chat-completion fallback.
//!
//! Used when the external agent yields no usable reply. One POST to an
//! OpenAI-compatible endpoint; every expected failure degrades to a fixed
//! user-facing message instead of an error.

use crate::config::Config;
use crate::conversation::{ConversationRequest, Role};
use crate::error::{DispatchFailure, ParleyError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};


/// Returned when no model credential is configured.
pub const NOT_CONFIGURED_REPLY: &str =
    "The assistant is not configured at the moment. Please contact your administrator.";

/// Returned when the completion endpoint fails or cannot be reached.
pub const UNAVAILABLE_REPLY: &str =
    "The assistant is temporarily unavailable. Please try again in a few moments.";

/// Returned when the model answers with empty content.
pub const NO_RESPONSE_REPLY: &str = "No response";

/// System instruction sent ahead of every fallback conversation.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful financial assistant for an accounting \
     practice. Answer questions about the selected client concisely and accurately. If you do \
     not have the data needed to answer, say so instead of guessing.";

/// One message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Answers a request straight from the model API.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    history_limit: usize,
    api_key: Option<String>,
}

impl FallbackResponder {
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = &config.fallback;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ParleyError::DispatchError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            history_limit: settings.history_limit,
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    /// Replace the HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// System instruction, the most recent prior turns, then the new message
    /// prefixed with who is asking.
    pub fn build_messages(&self, request: &ConversationRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage {
            role: Role::System,
            content: SYSTEM_INSTRUCTION.to_string(),
        }];

        messages.extend(
            request
                .recent_turns(self.history_limit)
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role,
                    content: turn.content.clone(),
                }),
        );

        messages.push(ChatMessage {
            role: Role::User,
            content: format!(
                "User: {}\n{}",
                request.user().display_identity(),
                request.message()
            ),
        });

        messages
    }

    /// Ask the model for a reply.
    ///
    /// The outer error is reserved for failing to construct the request at all;
    /// everything that can go wrong at runtime is an inner [`DispatchFailure`].
    pub async fn complete(
        &self,
        request: &ConversationRequest,
    ) -> Result<std::result::Result<String, DispatchFailure>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Err(DispatchFailure::FallbackUnconfigured));
        };

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: self.build_messages(request),
            temperature: self.temperature,
        };

        let http_request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .build()
            .map_err(|e| {
                ParleyError::DispatchError(format!("failed to build fallback request: {}", e))
            })?;

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting fallback completion");

        let response = match self.client.execute(http_request).await {
            Ok(response) => response,
            Err(e) => {
                return Ok(Err(DispatchFailure::FallbackHttpFailure {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                }));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Ok(Err(DispatchFailure::FallbackHttpFailure {
                status: Some(status.as_u16()),
                message: format!("{}: {}", status, detail.trim()),
            }));
        }

        let parsed: ChatCompletionResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(Err(DispatchFailure::FallbackHttpFailure {
                    status: Some(status.as_u16()),
                    message: format!("unreadable completion body: {}", e),
                }));
            }
        };

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Ok(Ok(NO_RESPONSE_REPLY.to_string()));
        }
        Ok(Ok(content))
    }

    /// Like [`complete`](Self::complete), with failures replaced by fixed messages.
    pub async fn respond(&self, request: &ConversationRequest) -> Result<String> {
        let reply = match self.complete(request).await? {
            Ok(reply) => reply,
            Err(DispatchFailure::FallbackUnconfigured) => {
                warn!("no model API key configured; cannot answer via fallback");
                NOT_CONFIGURED_REPLY.to_string()
            }
            Err(failure) => {
                warn!(error = %failure, "fallback completion failed");
                UNAVAILABLE_REPLY.to_string()
            }
        };
        Ok(reply)
    }
}
