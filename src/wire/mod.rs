//! The wire: a per-run event channel from the runtime to the UI.
//!
//! Each agent run gets a fresh wire. The producing side
//! ([`WireHandle`]) is held by the agent loop and whatever components it
//! explicitly hands the handle to; the consuming side ([`Wire`]) is owned by
//! exactly one UI consumer task. There is no global or task-local accessor:
//! the handle is always passed as an argument.
//!
//! # Example
//!
//! ```
//! # use soulwire::wire::{Wire, AgentEvent};
//! # tokio_test::block_on(async {
//! let (handle, mut wire) = Wire::new();
//! handle.send(AgentEvent::TextFragment("hello".to_string()));
//! handle.close();
//!
//! assert!(matches!(wire.recv().await, Some(AgentEvent::TextFragment(_))));
//! assert!(wire.recv().await.is_none());
//! # });
//! ```

mod event;

pub use event::{AgentEvent, StatusSnapshot};

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Shared sender slot. `close()` takes the sender out, which is what lets
/// queued events drain before the receiver sees the closed sentinel.
struct Shared {
    tx: Mutex<Option<mpsc::UnboundedSender<AgentEvent>>>,
}

/// The producing side of the wire. Cheap to clone.
#[derive(Clone)]
pub struct WireHandle {
    shared: Arc<Shared>,
}

impl WireHandle {
    /// Emit an event to the UI consumer.
    ///
    /// Synchronous, non-blocking, and never fails: the queue is unbounded,
    /// and a send after [`WireHandle::close`] is silently dropped.
    pub fn send(&self, event: AgentEvent) {
        let guard = self.shared.tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            // Receiver dropped means the consumer is gone; dropping the
            // event is the contract either way.
            let _ = tx.send(event);
        }
    }

    /// Close the wire. Idempotent.
    ///
    /// Events already queued are still delivered to the consumer before
    /// `recv` returns the closed sentinel.
    pub fn close(&self) {
        let mut guard = self.shared.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }
}

/// The consuming side of the wire.
pub struct Wire {
    rx: mpsc::UnboundedReceiver<AgentEvent>,
}

impl Wire {
    /// Create a new wire, returning the producer handle and the consumer.
    pub fn new() -> (WireHandle, Wire) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = WireHandle {
            shared: Arc::new(Shared {
                tx: Mutex::new(Some(tx)),
            }),
        };
        (handle, Wire { rx })
    }

    /// Receive the next event, in send order.
    ///
    /// # Returns
    ///
    /// `Some(event)` while the wire is open or still draining; `None` once
    /// the wire is closed *and* every queued event has been delivered.
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }
}
