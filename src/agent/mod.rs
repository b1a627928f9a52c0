//! Agent execution subsystem.
//!
//! - **History**: prior turns handed to the agent through a transient file
//! - **Environment**: the child's environment (credential, callback URL, client)
//! - **Runner**: the process seam, with a `tokio::process` implementation
//! - **Supervisor**: spawn, feed stdin, time out, settle exactly once
//! - **Extract**: find the reply in the agent's stdout
//! - **Cleanup**: artifact and timer disposal on every exit path

mod cleanup;
pub mod environment;
pub mod extract;
pub mod history;
pub mod runner;
pub mod settle;
mod supervisor;


// Re-export public API
pub use extract::{Extraction, ReplyExtractor, find_reply};
pub use runner::{AgentHandle, AgentRunner, ExitReport, Invocation, ProcessRunner};
pub use supervisor::{ProcessExecution, ReplyResult, Supervisor};
