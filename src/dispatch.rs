//! Conversation dispatcher.
//!
//! The public entry point: try the external agent once, and answer from the
//! fallback responder when that yields nothing usable. Every expected failure
//! still produces a reply string.

use crate::agent::{AgentRunner, ProcessRunner, Supervisor};
use crate::config::Config;
use crate::conversation::ConversationRequest;
use crate::error::Result;
use crate::fallback::FallbackResponder;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Dispatcher {
    supervisor: Supervisor,
    fallback: FallbackResponder,
}

impl Dispatcher {
    pub fn new(supervisor: Supervisor, fallback: FallbackResponder) -> Self {
        Self {
            supervisor,
            fallback,
        }
    }

    /// Dispatcher that runs the configured agent as a real child process.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    pub fn with_runner(config: &Config, runner: Arc<dyn AgentRunner>) -> Result<Self> {
        let fallback = FallbackResponder::from_config(config)?;
        if !fallback.is_configured() {
            warn!("no model API key configured; fallback replies will be unavailable");
        }

        Ok(Self::new(Supervisor::from_config(config, runner)?, fallback))
    }

    /// Produce a reply for `request`.
    ///
    /// Only fails when the fallback request cannot be constructed at all.
    pub async fn send_message(&self, request: &ConversationRequest) -> Result<String> {
        match self.supervisor.invoke(request).await {
            Ok(reply) => {
                info!(client_id = request.client_id(), "chat agent replied");
                Ok(reply)
            }
            Err(failure) => {
                warn!(
                    client_id = request.client_id(),
                    error = %failure,
                    "chat agent produced no usable reply; using fallback"
                );
                self.fallback.respond(request).await
            }
        }
    }
}
