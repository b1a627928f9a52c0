//! Single-assignment outcome cell.
//!
//! Several tasks race to decide how an agent run ended (process exit, the
//! timeout timer). Only the first `settle` call takes effect; later ones are
//! no-ops that report `false`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Write-once cell shared by the tasks competing to settle a run.
#[derive(Debug)]
pub struct SettleOnce<T> {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

/// Receiving side of a [`SettleOnce`].
///
/// Resolves with the settled value, or an error if every cell handle was
/// dropped without settling.
pub type Settlement<T> = oneshot::Receiver<T>;

impl<T> SettleOnce<T> {
    pub fn new() -> (Arc<Self>, Settlement<T>) {
        let (tx, rx) = oneshot::channel();
        let cell = Arc::new(Self {
            settled: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        });
        (cell, rx)
    }

    /// Settle with `value` if nobody has yet. Returns whether this call won.
    pub fn settle(&self, value: T) -> bool {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take();

        match sender {
            // The receiver may already be gone; the outcome is still decided.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}
