//! History side channel.
//!
//! Prior turns never go through the agent's stdin. They are written once to a
//! transient JSON file whose path is handed to the agent as
//! `--history-file <path>`.

use crate::conversation::PriorTurn;
use crate::error::{ParleyError, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local disambiguator for artifact names created in the same millisecond.
static ARTIFACT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A serialized history file that must be removed after the run.
#[derive(Debug)]
pub struct TransientArtifact {
    path: PathBuf,
}

impl TransientArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. A file that is already gone counts as removed.
    pub fn remove(self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Write the last `limit` turns of `history` into `scratch_dir`.
///
/// Returns `Ok(None)` when there is no history to share.
pub fn write_history(
    scratch_dir: &Path,
    history: &[PriorTurn],
    limit: usize,
) -> Result<Option<TransientArtifact>> {
    if history.is_empty() {
        return Ok(None);
    }

    let start = history.len().saturating_sub(limit);
    let payload = serde_json::to_vec(&history[start..]).map_err(|e| {
        ParleyError::UserError(format!("failed to serialize conversation history: {}", e))
    })?;

    let path = scratch_dir.join(artifact_name());

    // create_new keeps two requests from ever sharing a file.
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            ParleyError::UserError(format!(
                "failed to create history file '{}': {}",
                path.display(),
                e
            ))
        })?;

    let artifact = TransientArtifact { path };

    if let Err(e) = file.write_all(&payload).and_then(|_| file.flush()) {
        let message = format!(
            "failed to write history file '{}': {}",
            artifact.path.display(),
            e
        );
        drop(file);
        let _ = artifact.remove();
        return Err(ParleyError::UserError(message));
    }

    Ok(Some(artifact))
}

fn artifact_name() -> String {
    format!(
        "parley-history-{}-{}-{}.json",
        Utc::now().timestamp_millis(),
        std::process::id(),
        ARTIFACT_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}
