//! Time-travel controller: the DMail mailbox.
//!
//! A DMail is a message sent "back in time": it names an earlier checkpoint
//! and a directive. The model sends one through the `send_dmail` tool; at
//! the end of the step the agent loop fetches it, rewinds the context to
//! the target checkpoint, and replays from there with the directive
//! injected as a user message.
//!
//! At most one DMail can be pending at a time. The slot is shared between
//! the tool (writer) and the loop (reader) behind an `Arc`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoulError};

/// A rollback directive targeting an earlier checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DMail {
    /// Checkpoint id to rewind to.
    pub target_checkpoint: usize,
    /// Directive injected as a user message after the rewind.
    pub message: String,
}

/// Single-slot DMail mailbox with checkpoint validation.
#[derive(Debug, Default)]
pub struct TimeTravel {
    pending: Mutex<Option<DMail>>,
    /// Checkpoint count the loop syncs at the start of each step; used to
    /// validate targets without sharing the context itself.
    checkpoint_count: AtomicUsize,
}

impl TimeTravel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how many checkpoints currently exist.
    ///
    /// Called by the agent loop after each checkpoint so that
    /// [`TimeTravel::send`] can validate targets.
    pub fn sync_checkpoints(&self, count: usize) {
        self.checkpoint_count.store(count, Ordering::SeqCst);
    }

    /// Queue a DMail.
    ///
    /// # Errors
    ///
    /// `SoulError::Dmail` (recoverable) when one is already pending or the
    /// target checkpoint does not exist yet.
    pub fn send(&self, dmail: DMail) -> Result<()> {
        let known = self.checkpoint_count.load(Ordering::SeqCst);
        if dmail.target_checkpoint >= known {
            return Err(SoulError::Dmail(format!(
                "checkpoint {} does not exist (have {})",
                dmail.target_checkpoint, known
            )));
        }

        let mut slot = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(SoulError::Dmail(
                "a dmail is already pending; only one can be in flight".to_string(),
            ));
        }
        *slot = Some(dmail);
        Ok(())
    }

    /// Atomically take the pending DMail, leaving the slot empty.
    pub fn fetch_pending(&self) -> Option<DMail> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}
