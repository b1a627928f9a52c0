//! Agent process seam.
//!
//! The supervisor only talks to [`AgentRunner`] and [`AgentHandle`], so its
//! state machine can be driven by a scripted fake in tests. [`ProcessRunner`]
//! is the real implementation on top of `tokio::process`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Everything needed to launch one agent run.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Complete environment; nothing else is inherited.
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: String,
}

/// How a finished (or killed) process ended, with its captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Launches agent processes.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn spawn(&self, invocation: Invocation) -> io::Result<Box<dyn AgentHandle>>;
}

/// A running agent process.
#[async_trait]
pub trait AgentHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// Wait for exit and return the complete captured output.
    async fn wait(&mut self) -> io::Result<ExitReport>;

    /// Forcibly terminate the process. No grace period.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Runs the agent as a real child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl AgentRunner for ProcessRunner {
    async fn spawn(&self, invocation: Invocation) -> io::Result<Box<dyn AgentHandle>> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;

        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        // Fed from a task so a child that never reads stdin cannot stall us
        // ahead of the timer.
        if let Some(mut stdin) = child.stdin.take() {
            let payload = invocation.stdin;
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    debug!(error = %e, "agent closed stdin before reading the message");
                }
                // Dropping stdin closes it and signals end of input.
            });
        }

        Ok(Box::new(ProcessHandle {
            child,
            stdout: Some(stdout),
            stderr: Some(stderr),
        }))
    }
}

struct ProcessHandle {
    child: Child,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

#[async_trait]
impl AgentHandle for ProcessHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> io::Result<ExitReport> {
        let status = self.child.wait().await?;
        let stdout = collect(self.stdout.take()).await;
        let stderr = collect(self.stderr.take()).await;

        Ok(ExitReport {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        // On Unix this is SIGKILL; on Windows it is TerminateProcess.
        self.child.kill().await
    }
}

async fn read_stream<R>(stream: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream
        && let Err(e) = stream.read_to_end(&mut buf).await
    {
        debug!(error = %e, "agent output stream ended with an error");
    }
    buf
}

async fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    match reader {
        Some(handle) => {
            let bytes = handle.await.unwrap_or_default();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        None => String::new(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: std::env::vars().collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_exit_code() {
        let mut handle = ProcessRunner
            .spawn(sh("echo out; echo err >&2; exit 3"))
            .await
            .unwrap();
        assert!(handle.pid().is_some());

        let report = handle.wait().await.unwrap();
        assert_eq!(report.exit_code, Some(3));
        assert_eq!(report.stdout, "out\n");
        assert_eq!(report.stderr, "err\n");
        assert!(!report.success());
    }

    #[tokio::test]
    async fn stdin_receives_payload_then_eof() {
        let mut invocation = sh("cat");
        invocation.stdin = "Hello\n".to_string();

        let mut handle = ProcessRunner.spawn(invocation).await.unwrap();
        let report = handle.wait().await.unwrap();

        assert!(report.success());
        assert_eq!(report.stdout, "Hello\n");
    }

    #[tokio::test]
    async fn environment_is_passed_to_the_child() {
        let mut invocation = sh("echo \"${PARLEY_PROBE:-unset}\"");
        invocation.env = BTreeMap::from([
            ("PATH".to_string(), std::env::var("PATH").unwrap_or_default()),
            ("PARLEY_PROBE".to_string(), "present".to_string()),
        ]);

        let mut handle = ProcessRunner.spawn(invocation).await.unwrap();
        let report = handle.wait().await.unwrap();

        assert_eq!(report.stdout.trim(), "present");
    }

    #[tokio::test]
    async fn working_dir_is_applied() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut invocation = sh("pwd");
        invocation.working_dir = Some(temp_dir.path().to_path_buf());

        let mut handle = ProcessRunner.spawn(invocation).await.unwrap();
        let report = handle.wait().await.unwrap();

        let reported = std::fs::canonicalize(report.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(temp_dir.path()).unwrap());
    }

    #[tokio::test]
    async fn kill_terminates_without_exit_code() {
        let mut handle = ProcessRunner.spawn(sh("exec sleep 10")).await.unwrap();

        handle.kill().await.unwrap();
        let report = handle.wait().await.unwrap();
        assert_eq!(report.exit_code, None);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let invocation = Invocation {
            program: "parley_nonexistent_agent_xyz".to_string(),
            ..Default::default()
        };
        let err = ProcessRunner.spawn(invocation).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
