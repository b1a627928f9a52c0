//! Agent process supervisor.
//!
//! One call to [`Supervisor::invoke`] runs the external agent at most once:
//!
//! ```text
//! Spawning --spawn error--------------------------> Done (SpawnFailure)
//!    |
//!    v
//! Running --process exit--+
//!    |                    +--> Settling --> Done
//!    +----timer expiry----+    (first one wins; the child is killed on expiry)
//! ```
//!
//! Process exit and timer expiry race through a [`SettleOnce`] cell, so a late
//! exit can never overwrite a timeout and vice versa.

use super::cleanup::Cleanup;
use super::environment::build_environment;
use super::extract::{Extraction, ReplyExtractor};
use super::history::write_history;
use super::runner::{AgentHandle, AgentRunner, ExitReport, Invocation};
use super::settle::SettleOnce;
use crate::config::{BackendSettings, Config};
use crate::conversation::ConversationRequest;
use crate::error::{DispatchFailure, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Outcome of the primary agent path: a usable reply or why there is none.
pub type ReplyResult = std::result::Result<String, DispatchFailure>;

/// How a supervised run settled.
#[derive(Debug)]
enum RunOutcome {
    Exited(ExitReport),
    TimedOut,
    WaitFailed(String),
}

/// Request-local record of one agent process.
#[derive(Debug)]
pub struct ProcessExecution {
    pub pid: Option<u32>,
    pub started_at: Instant,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub settled: bool,
}

impl ProcessExecution {
    fn started(pid: Option<u32>) -> Self {
        Self {
            pid,
            started_at: Instant::now(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            settled: false,
        }
    }

    fn settle(&mut self, report: Option<ExitReport>) {
        if let Some(report) = report {
            self.exit_code = report.exit_code;
            self.stdout = report.stdout;
            self.stderr = report.stderr;
        }
        self.settled = true;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Runs the external agent for one request under a hard timeout.
pub struct Supervisor {
    runner: Arc<dyn AgentRunner>,
    program: String,
    entry_args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    scratch_dir: PathBuf,
    side_channel_limit: usize,
    backend: BackendSettings,
    extractor: ReplyExtractor,
}

impl Supervisor {
    pub fn from_config(config: &Config, runner: Arc<dyn AgentRunner>) -> Result<Self> {
        let (program, entry_args) = config.agent_argv()?;

        Ok(Self {
            runner,
            program,
            entry_args,
            working_dir: config.agent.working_dir.clone(),
            timeout: config.agent_timeout(),
            scratch_dir: config.scratch_dir(),
            side_channel_limit: config.history.side_channel_limit,
            backend: config.backend.clone(),
            extractor: ReplyExtractor::from_config(config)?,
        })
    }

    /// Run the agent for `request` and extract its reply.
    ///
    /// Never blocks the calling thread. The history artifact and timer are
    /// cleaned up on every path, including cancellation of this future.
    pub async fn invoke(&self, request: &ConversationRequest) -> ReplyResult {
        info!(
            client_id = request.client_id(),
            user_id = %request.user().id,
            "spawning chat agent"
        );

        let artifact =
            match write_history(&self.scratch_dir, request.history(), self.side_channel_limit) {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(error = %e, "continuing without conversation history");
                    None
                }
            };

        let mut cleanup = Cleanup::new(artifact);
        let result = self.supervise(request, &mut cleanup).await;
        cleanup.finish();
        result
    }

    /// Build the child invocation for `request`.
    pub fn invocation(
        &self,
        request: &ConversationRequest,
        history_file: Option<&Path>,
    ) -> Invocation {
        let mut args = self.entry_args.clone();
        args.push("--client-id".to_string());
        args.push(request.client_id().to_string());
        if let Some(path) = history_file {
            args.push("--history-file".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        Invocation {
            program: self.program.clone(),
            args,
            env: build_environment(ambient_vars(), request, &self.backend),
            working_dir: self.working_dir.clone(),
            stdin: format!("{}\n", request.message()),
        }
    }

    async fn supervise(&self, request: &ConversationRequest, cleanup: &mut Cleanup) -> ReplyResult {
        let invocation = self.invocation(request, cleanup.artifact_path());

        if !invocation.env.contains_key("OPENAI_API_KEY") {
            warn!("OPENAI_API_KEY is not set in the agent environment; the agent may fail to run");
        }

        let handle = self.runner.spawn(invocation).await.map_err(|e| {
            error!(program = %self.program, error = %e, "failed to start chat agent");
            DispatchFailure::SpawnFailure {
                program: self.program.clone(),
                message: e.to_string(),
            }
        })?;

        let mut execution = ProcessExecution::started(handle.pid());

        let (cell, settlement) = SettleOnce::new();
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(watch_exit(handle, Arc::clone(&cell), kill_rx));

        let timeout = self.timeout;
        cleanup.track_timer(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if cell.settle(RunOutcome::TimedOut) {
                let _ = kill_tx.send(());
            }
        }));

        let outcome = settlement.await;
        debug!(
            pid = ?execution.pid,
            elapsed_ms = execution.elapsed().as_millis() as u64,
            "chat agent settled"
        );

        match outcome {
            Ok(RunOutcome::Exited(report)) => {
                let result = self.conclude(&report);
                execution.settle(Some(report));
                result
            }
            Ok(RunOutcome::TimedOut) => {
                execution.settle(None);
                error!(
                    timeout_ms = timeout.as_millis() as u64,
                    "chat agent timed out"
                );
                Err(DispatchFailure::Timeout { after: timeout })
            }
            Ok(RunOutcome::WaitFailed(message)) => {
                execution.settle(None);
                error!(error = %message, "lost track of chat agent process");
                Err(DispatchFailure::NonZeroExit {
                    code: None,
                    stderr: message,
                })
            }
            Err(_) => Err(DispatchFailure::NonZeroExit {
                code: None,
                stderr: "agent supervision ended without an outcome".to_string(),
            }),
        }
    }

    fn conclude(&self, report: &ExitReport) -> ReplyResult {
        debug!(exit_code = ?report.exit_code, "chat agent exited");

        if !report.success() {
            if !report.stderr.trim().is_empty() {
                error!(stderr = %report.stderr.trim_end(), "chat agent failed");
            }
            return Err(DispatchFailure::NonZeroExit {
                code: report.exit_code,
                stderr: report.stderr.clone(),
            });
        }

        match self.extractor.extract(&report.stdout) {
            Extraction::Reply(reply) => Ok(reply),
            Extraction::NotFound => {
                warn!("could not find a reply marker in chat agent output");
                Err(DispatchFailure::ExtractionFailure {
                    reason: format!("no '{}' line in agent output", self.extractor.marker()),
                })
            }
            Extraction::Degenerate(reply) => {
                warn!(reply = %reply, "chat agent produced a non-informative reply");
                Err(DispatchFailure::ExtractionFailure {
                    reason: format!("degenerate reply '{}'", reply),
                })
            }
        }
    }
}

/// Our environment, minus variables that are not valid UTF-8.
fn ambient_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Wait for the child to exit, or kill it when the timer fires first.
async fn watch_exit(
    mut handle: Box<dyn AgentHandle>,
    cell: Arc<SettleOnce<RunOutcome>>,
    mut kill_rx: oneshot::Receiver<()>,
) {
    let report = tokio::select! {
        report = handle.wait() => report,
        // Fires on timeout, or closes when the request is dropped.
        _ = &mut kill_rx => {
            if let Err(e) = handle.kill().await {
                warn!(error = %e, "failed to kill chat agent");
            }
            handle.wait().await
        }
    };

    let outcome = match report {
        Ok(report) => RunOutcome::Exited(report),
        Err(e) => RunOutcome::WaitFailed(e.to_string()),
    };

    if !cell.settle(outcome) {
        debug!("chat agent exit arrived after the request settled; ignoring");
    }
}
