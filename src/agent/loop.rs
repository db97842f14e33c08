//! The agent loop: the step state machine driving one run.
//!
//! A run repeats steps until the model finishes a turn without requesting
//! tool calls, the step budget runs out, or a cancellation signal arrives.
//! Each step:
//!
//! 1. emits `StepBegin` on the wire
//! 2. compacts the context if it is near the window
//! 3. records a checkpoint and syncs it into the time-travel controller
//! 4. calls the model (streaming, fragments forwarded, retried on
//!    transient failures)
//! 5. dispatches the requested tool calls concurrently, draining the
//!    approval queue while they are in flight
//! 6. appends the assistant message and the tool results in request order
//! 7. intercepts a pending DMail, rewinding and replaying without
//!    consuming a step

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::approval::{ApprovalGate, ApprovalRequest};
use crate::client::{collect_step, ChatClient, RetryPolicy};
use crate::error::{Result, SoulError};
use crate::history::{Context, Message, ToolCall, ToolResult};
use crate::timetravel::{DMail, TimeTravel};
use crate::tools::{ToolInvocation, Toolset};
use crate::wire::{AgentEvent, StatusSnapshot, WireHandle};

use super::compaction::compact;

/// How a finished run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model finished a turn without tool calls.
    Finished {
        /// Steps consumed, including the final one.
        steps: u32,
        /// The model's final text reply.
        reply: String,
    },
    /// The run was cancelled mid-step; nothing from the interrupted step
    /// reached the context.
    Cancelled,
}

/// What one step decided about the run.
enum StepOutcome {
    /// Tool calls were dispatched; take another step.
    Continue,
    /// The model finished without tool calls.
    Finished(String),
    /// A DMail is pending; rewind and replay without consuming a step.
    Rollback(DMail),
}

/// The step state machine for one conversation run.
///
/// Owns the [`Context`] exclusively; nothing else mutates history.
///
/// # Example
///
/// ```rust,ignore
/// let timetravel = Arc::new(TimeTravel::new());
/// let (gate, approval_queue) = ApprovalGate::new();
/// let mut agent = AgentLoop::new(toolset, gate, approval_queue, timetravel)
///     .with_client(Arc::new(OpenAiClient::new(api_key)))
///     .with_system_prompt("You are a helpful agent.");
///
/// let outcome = agent.run("list my files", &wire_handle).await?;
/// ```
pub struct AgentLoop {
    client: Option<Arc<dyn ChatClient>>,
    toolset: Arc<dyn Toolset>,
    gate: Arc<ApprovalGate>,
    /// Approval requests the gate queues; drained while tools run.
    approval_queue: mpsc::UnboundedReceiver<ApprovalRequest>,
    timetravel: Arc<TimeTravel>,
    context: Context,
    system_prompt: String,
    retry: RetryPolicy,
    max_steps: u32,
    max_context_tokens: usize,
    reserved_tokens: usize,
    preserve_recent: usize,
    workspace: PathBuf,
    cancel: watch::Receiver<bool>,
    /// Kept so the default cancel receiver stays live when the caller
    /// never installs one.
    _cancel_tx: Option<watch::Sender<bool>>,
}

impl AgentLoop {
    /// Create a loop over the given collaborators with default settings.
    pub fn new(
        toolset: Arc<dyn Toolset>,
        gate: Arc<ApprovalGate>,
        approval_queue: mpsc::UnboundedReceiver<ApprovalRequest>,
        timetravel: Arc<TimeTravel>,
    ) -> Self {
        let (cancel_tx, cancel) = watch::channel(false);
        Self {
            client: None,
            toolset,
            gate,
            approval_queue,
            timetravel,
            context: Context::new(),
            system_prompt: String::new(),
            retry: RetryPolicy::new(),
            max_steps: 20,
            max_context_tokens: 128_000,
            reserved_tokens: 0,
            preserve_recent: 2,
            workspace: PathBuf::new(),
            cancel,
            _cancel_tx: Some(cancel_tx),
        }
    }

    /// Set the chat client. Running without one is a configuration error.
    pub fn with_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the system prompt sent with every model call.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the retry policy for model calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the step budget. Exceeding it is fatal.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the context window size and the headroom reserved for the next
    /// response; compaction triggers when
    /// `estimated_tokens + reserved >= max`.
    pub fn with_context_budget(mut self, max_context_tokens: usize, reserved_tokens: usize) -> Self {
        self.max_context_tokens = max_context_tokens;
        self.reserved_tokens = reserved_tokens;
        self
    }

    /// Set how many recent user/assistant messages compaction preserves.
    pub fn with_preserve_recent(mut self, preserve_recent: usize) -> Self {
        self.preserve_recent = preserve_recent;
        self
    }

    /// Set the per-message token heuristic used before real usage arrives.
    pub fn with_tokens_per_message(mut self, tokens: usize) -> Self {
        self.context = std::mem::take(&mut self.context).with_tokens_per_message(tokens);
        self
    }

    /// Set the workspace directory handed to tools.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Install a cancellation signal. Flipping the channel to `true`
    /// cancels the in-flight step before anything from it reaches the
    /// context.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self._cancel_tx = None;
        self
    }

    /// The approval gate tools and the UI consumer share.
    pub fn gate(&self) -> Arc<ApprovalGate> {
        self.gate.clone()
    }

    /// Read access to the conversation history, mainly for tests and
    /// persistence collaborators.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Drive one user turn to completion.
    ///
    /// # Arguments
    /// * `user_input` - The user's message starting this run
    /// * `wire` - Event channel to the UI consumer
    ///
    /// # Errors
    ///
    /// `SoulError::Config` when no client is set, `SoulError::MaxSteps`
    /// when the budget runs out, or a fatal client error once retries are
    /// exhausted. Cancellation is not an error.
    pub async fn run(
        &mut self,
        user_input: impl Into<String>,
        wire: &WireHandle,
    ) -> Result<RunOutcome> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| SoulError::Config("no chat client configured".to_string()))?;

        self.context.append(Message::user(user_input.into()));

        let mut step: u32 = 1;
        loop {
            if step > self.max_steps {
                return Err(SoulError::MaxSteps(self.max_steps));
            }

            let cancel = self.cancel.clone();
            let outcome = tokio::select! {
                // Dropping the step future cancels the streaming call
                // before any append.
                _ = wait_cancelled(cancel) => {
                    info!(step, "Run cancelled");
                    return Ok(RunOutcome::Cancelled);
                }
                outcome = self.step(step, &client, wire) => outcome?,
            };

            match outcome {
                StepOutcome::Finished(reply) => {
                    info!(steps = step, "Run finished");
                    return Ok(RunOutcome::Finished { steps: step, reply });
                }
                StepOutcome::Continue => {
                    step += 1;
                }
                StepOutcome::Rollback(dmail) => {
                    info!(
                        target = dmail.target_checkpoint,
                        "DMail received, rewinding"
                    );
                    self.context.revert_to(dmail.target_checkpoint)?;
                    self.context.checkpoint();
                    self.timetravel
                        .sync_checkpoints(self.context.checkpoint_count());
                    self.context.append(Message::user(dmail.message));
                    // Replay does not consume a step.
                }
            }
        }
    }

    /// Execute one step. Everything that mutates the context happens here,
    /// after all awaiting on the model and tools has completed.
    async fn step(
        &mut self,
        step: u32,
        client: &Arc<dyn ChatClient>,
        wire: &WireHandle,
    ) -> Result<StepOutcome> {
        wire.send(AgentEvent::StepBegin { step });
        debug!(step, messages = self.context.len(), "Step begin");

        if self.context.estimated_tokens() + self.reserved_tokens >= self.max_context_tokens {
            wire.send(AgentEvent::CompactionBegin);
            let compacted =
                compact(self.context.snapshot(), client.as_ref(), self.preserve_recent).await?;
            self.context.rebuild(compacted);
            self.timetravel
                .sync_checkpoints(self.context.checkpoint_count());
            wire.send(AgentEvent::CompactionEnd);
        }

        self.context.checkpoint();
        self.timetravel
            .sync_checkpoints(self.context.checkpoint_count());

        let system_prompt = self.system_prompt.clone();
        let tools = self.toolset.definitions();
        let history = self.context.snapshot();
        let response = self
            .retry
            .run(client.name(), || {
                let client = client.clone();
                let system_prompt = system_prompt.clone();
                let tools = tools.clone();
                let history = history.clone();
                let wire = wire.clone();
                async move {
                    let rx = client.stream_step(&system_prompt, &tools, &history).await?;
                    collect_step(rx, &wire).await
                }
            })
            .await?;

        if let Some(usage) = response.usage {
            self.context.update_token_count(usage.total() as usize);
        }
        // Sent every step: without usage numbers the ratio falls back to
        // the per-message heuristic, so the indicator stays non-zero.
        wire.send(AgentEvent::StatusUpdate(StatusSnapshot {
            context_usage_ratio: self.context.usage_ratio(self.max_context_tokens),
        }));

        let tool_calls = response.tool_calls.clone();
        let reply = response.content.clone();
        self.context.append(response.into_message());

        if tool_calls.is_empty() {
            return Ok(StepOutcome::Finished(reply));
        }

        let results = self.dispatch_tools(&tool_calls, wire).await;
        for result in results {
            wire.send(AgentEvent::ToolResult(result.clone()));
            self.context.append(result.into_message());
        }

        if let Some(dmail) = self.timetravel.fetch_pending() {
            return Ok(StepOutcome::Rollback(dmail));
        }
        Ok(StepOutcome::Continue)
    }

    /// Run one turn's tool calls concurrently.
    ///
    /// Results come back in request order regardless of completion order.
    /// While calls are in flight the approval queue is drained and
    /// forwarded to the wire, so a tool waiting on a human does not
    /// deadlock the run.
    async fn dispatch_tools(&mut self, calls: &[ToolCall], wire: &WireHandle) -> Vec<ToolResult> {
        let futures: Vec<_> = calls
            .iter()
            .map(|call| {
                let toolset = self.toolset.clone();
                let invocation =
                    ToolInvocation::new(&call.id).with_workspace(self.workspace.clone());
                let name = call.name.clone();
                let arguments = call.arguments.clone();
                async move { toolset.invoke(&name, &arguments, &invocation).await }
            })
            .collect();

        let joined = futures::future::join_all(futures);
        tokio::pin!(joined);

        loop {
            tokio::select! {
                results = &mut joined => return results,
                request = self.approval_queue.recv() => {
                    match request {
                        Some(request) => {
                            wire.send(AgentEvent::ApprovalRequested {
                                id: request.id,
                                tool_call_id: request.tool_call_id,
                                requester: request.requester,
                                action: request.action,
                                description: request.description,
                            });
                        }
                        None => {
                            // Gate dropped; tools can no longer request
                            // approval, just wait for them to finish.
                            warn!("Approval queue closed while tools in flight");
                            return joined.await;
                        }
                    }
                }
            }
        }
    }
}

/// Resolve when the cancellation signal flips to `true`; pend forever when
/// the sender is gone.
async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
