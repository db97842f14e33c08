//! Human-in-the-loop approval gate.
//!
//! Tools that perform sensitive actions ask the gate for permission before
//! proceeding. The gate enqueues an [`ApprovalRequest`] that the agent loop
//! forwards to the wire, then suspends the tool on a oneshot until the UI
//! consumer resolves the request. Auto-approve mode and session-approved
//! actions short-circuit without a request.
//!
//! The gate never touches the wire itself; requests travel through an
//! internal queue the loop drains while tool calls are in flight.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SoulError};
use crate::tools::ToolInvocation;

/// How a human answered an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Allow this one invocation.
    Approve,
    /// Allow this invocation and every later request with the same action.
    ApproveForSession,
    /// Deny the invocation.
    Reject,
}

/// A pending request for human approval.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub tool_call_id: String,
    /// Tool name asking for permission.
    pub requester: String,
    /// Short machine-oriented action label, e.g. `"shell_exec"`.
    pub action: String,
    /// Human-readable description of what will happen.
    pub description: String,
}

struct PendingEntry {
    action: String,
    responder: oneshot::Sender<ApprovalDecision>,
}

/// The approval gate shared between tools (requesters) and the UI consumer
/// (resolver).
pub struct ApprovalGate {
    auto_approve: AtomicBool,
    session_approved: Mutex<HashSet<String>>,
    queue_tx: mpsc::UnboundedSender<ApprovalRequest>,
    pending: Mutex<HashMap<Uuid, PendingEntry>>,
}

impl ApprovalGate {
    /// Create a gate along with the request queue the agent loop drains.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Self {
            auto_approve: AtomicBool::new(false),
            session_approved: Mutex::new(HashSet::new()),
            queue_tx,
            pending: Mutex::new(HashMap::new()),
        });
        (gate, queue_rx)
    }

    /// Enable or disable auto-approve mode.
    pub fn set_auto_approve(&self, enabled: bool) {
        self.auto_approve.store(enabled, Ordering::SeqCst);
    }

    /// Ask permission to perform `action` on behalf of the given invocation.
    ///
    /// Suspends until a human answers, unless auto-approve is on or the
    /// action was previously approved for the session.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when approved, `Ok(false)` when rejected.
    ///
    /// # Errors
    ///
    /// `SoulError::Rejected` (recoverable) when the resolving side went
    /// away before answering.
    pub async fn request(
        &self,
        invocation: &ToolInvocation,
        requester: &str,
        action: &str,
        description: &str,
    ) -> Result<bool> {
        if self.auto_approve.load(Ordering::SeqCst) {
            return Ok(true);
        }
        {
            let session = self
                .session_approved
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if session.contains(action) {
                return Ok(true);
            }
        }

        let id = Uuid::new_v4();
        let (responder, answer) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.insert(
                id,
                PendingEntry {
                    action: action.to_string(),
                    responder,
                },
            );
        }

        let request = ApprovalRequest {
            id,
            tool_call_id: invocation.call_id.clone(),
            requester: requester.to_string(),
            action: action.to_string(),
            description: description.to_string(),
        };
        debug!(id = %id, action = action, "Approval requested");

        if self.queue_tx.send(request).is_err() {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
            return Err(SoulError::Rejected(
                "approval queue closed before the request could be delivered".to_string(),
            ));
        }

        match answer.await {
            Ok(decision) => {
                debug!(id = %id, decision = ?decision, "Approval resolved");
                Ok(!matches!(decision, ApprovalDecision::Reject))
            }
            Err(_) => Err(SoulError::Rejected(
                "approval request dropped without a decision".to_string(),
            )),
        }
    }

    /// Resolve a pending request. Called by the UI consumer.
    ///
    /// Each request is resolved exactly once; resolving an unknown or
    /// already-resolved id is a no-op.
    pub fn resolve(&self, id: Uuid, decision: ApprovalDecision) {
        let entry = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.remove(&id)
        };
        let Some(entry) = entry else {
            debug!(id = %id, "Resolve for unknown approval id ignored");
            return;
        };

        if decision == ApprovalDecision::ApproveForSession {
            self.session_approved
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(entry.action);
        }
        // The requester may have been cancelled; a dead receiver is fine.
        let _ = entry.responder.send(decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invocation() -> ToolInvocation {
        ToolInvocation {
            call_id: "call_1".to_string(),
            workspace: PathBuf::from("/tmp"),
        }
    }

    #[tokio::test]
    async fn test_auto_approve_short_circuits() {
        let (gate, mut queue) = ApprovalGate::new();
        gate.set_auto_approve(true);

        let approved = gate
            .request(&invocation(), "shell", "shell_exec", "run ls")
            .await
            .unwrap();
        assert!(approved);
        // No request was enqueued.
        assert!(queue.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_approve_resolves_requester() {
        let (gate, mut queue) = ApprovalGate::new();

        let gate2 = gate.clone();
        let task = tokio::spawn(async move {
            gate2
                .request(&invocation(), "shell", "shell_exec", "run ls")
                .await
        });

        let request = queue.recv().await.unwrap();
        assert_eq!(request.tool_call_id, "call_1");
        assert_eq!(request.action, "shell_exec");
        gate.resolve(request.id, ApprovalDecision::Approve);

        assert!(task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_reject_returns_false() {
        let (gate, mut queue) = ApprovalGate::new();

        let gate2 = gate.clone();
        let task = tokio::spawn(async move {
            gate2
                .request(&invocation(), "shell", "shell_exec", "rm -rf /")
                .await
        });

        let request = queue.recv().await.unwrap();
        gate.resolve(request.id, ApprovalDecision::Reject);

        assert!(!task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_approve_for_session_short_circuits_second_request() {
        let (gate, mut queue) = ApprovalGate::new();

        let gate2 = gate.clone();
        let task = tokio::spawn(async move {
            gate2
                .request(&invocation(), "shell", "shell_exec", "run ls")
                .await
        });

        let request = queue.recv().await.unwrap();
        gate.resolve(request.id, ApprovalDecision::ApproveForSession);
        assert!(task.await.unwrap().unwrap());

        // Same action again: approved with no new queue entry.
        let approved = gate
            .request(&invocation(), "shell", "shell_exec", "run ls again")
            .await
            .unwrap();
        assert!(approved);
        assert!(queue.try_recv().is_err());

        // A different action still queues.
        let gate2 = gate.clone();
        let task = tokio::spawn(async move {
            gate2
                .request(&invocation(), "fs", "file_write", "write a file")
                .await
        });
        let request = queue.recv().await.unwrap();
        assert_eq!(request.action, "file_write");
        gate.resolve(request.id, ApprovalDecision::Reject);
        assert!(!task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_is_noop() {
        let (gate, _queue) = ApprovalGate::new();
        gate.resolve(Uuid::new_v4(), ApprovalDecision::Approve);
    }

    #[tokio::test]
    async fn test_dropped_queue_yields_recoverable_error() {
        let (gate, queue) = ApprovalGate::new();
        drop(queue);

        let err = gate
            .request(&invocation(), "shell", "shell_exec", "run ls")
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }
}
