//! Events carried over the wire.

use crate::history::ToolResult;
use uuid::Uuid;

/// Derived status the UI can render as a gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// Fraction of the context window in use, in `[0, 1]`.
    pub context_usage_ratio: f32,
}

/// One event on the runtime-to-UI wire.
///
/// Fragment events stream as they arrive from the model; the rest mark
/// phase transitions in the step loop.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A new step is starting (1-based).
    StepBegin { step: u32 },
    /// A fragment of assistant text, in stream order.
    TextFragment(String),
    /// A fragment of a tool call still being assembled.
    ToolCallFragment {
        /// Call id, present once the model has emitted it.
        id: Option<String>,
        /// Tool name, present on the first fragment of a call.
        name: Option<String>,
        /// Raw JSON arguments fragment.
        fragment: String,
    },
    /// A completed tool invocation result.
    ToolResult(ToolResult),
    /// Compaction is about to rewrite the history.
    CompactionBegin,
    /// Compaction finished; the history has been rebuilt.
    CompactionEnd,
    /// Fresh usage numbers after a model response.
    StatusUpdate(StatusSnapshot),
    /// A tool is waiting for human approval. The consumer resolves it
    /// through the approval gate using `id`.
    ApprovalRequested {
        id: Uuid,
        tool_call_id: String,
        /// Tool name asking for permission.
        requester: String,
        /// Short machine-oriented action label, e.g. `"shell_exec"`.
        action: String,
        /// Human-readable description of what will happen.
        description: String,
    },
}
