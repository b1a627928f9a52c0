//! Parley: supervised single-shot dispatch of chat messages to an external
//! agent process, with a direct chat-completion fallback.
//!
//! [`dispatch::Dispatcher::send_message`] is the entry point. It always
//! resolves to a reply string for expected failures; see [`error`] for the
//! failure taxonomy.

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod fallback;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_support;

pub use conversation::{ConversationRequest, PriorTurn, RequestingUser, Role};
pub use dispatch::Dispatcher;
pub use error::{DispatchFailure, ParleyError, Result};
