//! Child process environment.
//!
//! The agent gets our full ambient environment plus what its tools need to call
//! back into the host API on the caller's behalf.

use crate::config::BackendSettings;
use crate::conversation::ConversationRequest;
use std::collections::BTreeMap;

/// Bearer credential name read by the agent's backend tools.
pub const ENV_BACKEND_JWT: &str = "BACKEND_JWT";

/// Alias of [`ENV_BACKEND_JWT`] read by the banking tools.
pub const ENV_BANK_API_TOKEN: &str = "BANK_API_TOKEN";

/// Base URL of the host API.
pub const ENV_BACKEND_API_URL: &str = "BACKEND_API_URL";

/// Client the conversation is about.
pub const ENV_CLIENT_EIN: &str = "CLIENT_EIN";

/// Resolve the callback base URL: explicit override, then the externally
/// reachable host URL, then loopback on the configured port.
pub fn backend_base_url(backend: &BackendSettings) -> String {
    [backend.api_base_url.as_deref(), backend.external_url.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("http://localhost:{}", backend.port))
}

/// Build the complete environment for one agent run.
///
/// `ambient` is usually `std::env::vars()`; injected values win over ambient ones.
pub fn build_environment<I>(
    ambient: I,
    request: &ConversationRequest,
    backend: &BackendSettings,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = ambient.into_iter().collect();

    if let Some(token) = request.credential() {
        env.insert(ENV_BACKEND_JWT.to_string(), token.to_string());
        env.insert(ENV_BANK_API_TOKEN.to_string(), token.to_string());
    }

    env.insert(ENV_BACKEND_API_URL.to_string(), backend_base_url(backend));
    env.insert(ENV_CLIENT_EIN.to_string(), request.client_id().to_string());

    env
}
