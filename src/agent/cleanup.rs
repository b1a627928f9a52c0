//! Per-run cleanup.
//!
//! Owns the history artifact and the timeout timer for one run. Finishing (or
//! dropping) it deletes the artifact and aborts the timer, whichever way the
//! run ended. Failures are logged, never returned.

use super::history::TransientArtifact;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Cleanup {
    artifact: Option<TransientArtifact>,
    timer: Option<JoinHandle<()>>,
}

impl Cleanup {
    pub fn new(artifact: Option<TransientArtifact>) -> Self {
        Self {
            artifact,
            timer: None,
        }
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact.as_ref().map(TransientArtifact::path)
    }

    pub fn track_timer(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.timer.replace(timer) {
            previous.abort();
        }
    }

    pub fn finish(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        if let Some(artifact) = self.artifact.take() {
            let path = artifact.path().to_path_buf();
            match artifact.remove() {
                Ok(()) => debug!(path = %path.display(), "removed history file"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove history file"
                ),
            }
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.run();
    }
}
