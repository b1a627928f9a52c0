//! Shared test fixtures: a scripted agent runner and a one-shot HTTP stub.

use crate::agent::{AgentHandle, AgentRunner, ExitReport, Invocation};
use crate::config::Config;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What a [`FakeRunner`] process does once spawned.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeScript {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// How long the process "runs" before exiting.
    pub delay: Duration,
    /// Fail the spawn itself with this error kind.
    pub spawn_error: Option<io::ErrorKind>,
    /// Keep running after `kill`, exiting only once `delay` has passed.
    pub ignore_kill: bool,
}

impl FakeScript {
    pub fn replying(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failing(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(code),
            ..Default::default()
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            exit_code: Some(0),
            delay,
            ..Default::default()
        }
    }

    pub fn unlaunchable() -> Self {
        Self {
            spawn_error: Some(io::ErrorKind::NotFound),
            ..Default::default()
        }
    }
}

/// Observations recorded by a [`FakeRunner`] and its handles.
#[derive(Debug, Default)]
pub(crate) struct FakeProbe {
    pub killed: AtomicBool,
    pub exited: AtomicBool,
    pub invocations: Mutex<Vec<Invocation>>,
}

impl FakeProbe {
    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn spawn_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn last_invocation(&self) -> Invocation {
        self.invocations.lock().unwrap().last().cloned().unwrap()
    }
}

/// Scripted [`AgentRunner`] that never touches the OS.
pub(crate) struct FakeRunner {
    script: FakeScript,
    probe: Arc<FakeProbe>,
}

impl FakeRunner {
    pub fn new(script: FakeScript) -> (Arc<Self>, Arc<FakeProbe>) {
        let probe = Arc::new(FakeProbe::default());
        let runner = Arc::new(Self {
            script,
            probe: Arc::clone(&probe),
        });
        (runner, probe)
    }
}

#[async_trait]
impl AgentRunner for FakeRunner {
    async fn spawn(&self, invocation: Invocation) -> io::Result<Box<dyn AgentHandle>> {
        self.probe.invocations.lock().unwrap().push(invocation);

        if let Some(kind) = self.script.spawn_error {
            return Err(io::Error::new(kind, "fake spawn failure"));
        }

        Ok(Box::new(FakeHandle {
            script: self.script.clone(),
            exits_at: Instant::now() + self.script.delay,
            kill_signal: Notify::new(),
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct FakeHandle {
    script: FakeScript,
    exits_at: Instant,
    kill_signal: Notify,
    probe: Arc<FakeProbe>,
}

#[async_trait]
impl AgentHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    async fn wait(&mut self) -> io::Result<ExitReport> {
        let ignore_kill = self.script.ignore_kill;
        let killed = tokio::select! {
            _ = tokio::time::sleep_until(self.exits_at) => false,
            _ = self.kill_signal.notified(), if !ignore_kill => true,
        };

        if killed {
            return Ok(ExitReport {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        self.probe.exited.store(true, Ordering::SeqCst);
        Ok(ExitReport {
            exit_code: self.script.exit_code,
            stdout: self.script.stdout.clone(),
            stderr: self.script.stderr.clone(),
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.probe.killed.store(true, Ordering::SeqCst);
        self.kill_signal.notify_one();
        Ok(())
    }
}

/// Default config with a short timeout and history files under `scratch`.
pub(crate) fn test_config(scratch: &Path) -> Config {
    let mut config = Config::default();
    config.agent.timeout_ms = 2_000;
    config.history.scratch_dir = Some(scratch.to_path_buf());
    config
}

/// Number of entries currently in `dir`.
pub(crate) fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// One HTTP request as received by [`serve_once`].
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Answer exactly one HTTP request on a loopback port with `status` and `body`.
///
/// Returns the base URL and a handle resolving to the captured request.
pub(crate) async fn serve_once(
    status: u16,
    body: impl Into<String>,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let body = body.into();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        let body_start = head_end + 4;
        while buf.len() < body_start + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body =
            String::from_utf8_lossy(&buf[body_start..(body_start + content_length).min(buf.len())])
                .into_owned();

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            if status < 400 { "OK" } else { "Error" },
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;

        CapturedRequest {
            head,
            body: request_body,
        }
    });

    (url, server)
}

/// Chat-completion response body carrying `content` as the first choice.
pub(crate) fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}
