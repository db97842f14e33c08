//! Chat client trait and streaming step types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ClientError, Result};
use crate::history::{Message, ToolCall};
use crate::wire::{AgentEvent, WireHandle};

/// A tool made available to the model for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// Token usage reported by the client for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One event in a streaming model response.
#[derive(Debug)]
pub enum StreamEvent {
    /// A fragment of assistant text.
    TextFragment(String),
    /// A fragment of a tool call. Fragments with the same `index` belong to
    /// the same call; `id` and `name` arrive on the first fragment.
    ToolCallFragment {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        /// Raw JSON arguments fragment (may be empty).
        arguments: String,
    },
    /// Usage numbers, emitted once near the end of the stream.
    Usage(Usage),
    /// The stream failed partway through.
    Failed(ClientError),
}

/// The assembled result of one model step.
#[derive(Debug, Clone, Default)]
pub struct StepResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

impl StepResponse {
    /// Convert into the assistant [`Message`] appended to history.
    pub fn into_message(self) -> Message {
        let content = if self.content.is_empty() {
            None
        } else {
            Some(self.content)
        };
        Message::assistant_step(content, self.tool_calls)
    }
}

/// An LLM chat endpoint the runtime can drive.
///
/// Implementations perform exactly one streaming request per
/// [`ChatClient::stream_step`] call. The receiver yields events until the
/// response completes or a [`StreamEvent::Failed`] is emitted.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Short identifier for logging, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// The model used when config does not specify one.
    fn default_model(&self) -> &str;

    /// Start one streaming model step over the given history.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`](crate::error::ClientError)-wrapping error
    /// when the request cannot be started (connection failure, auth, bad
    /// status). Mid-stream failures arrive as [`StreamEvent::Failed`].
    async fn stream_step(
        &self,
        system_prompt: &str,
        tools: &[ToolDefinition],
        history: &[Message],
    ) -> Result<mpsc::Receiver<StreamEvent>>;
}

/// Partially-assembled tool call, keyed by stream index.
#[derive(Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Drain a streaming step, forwarding fragments to the wire and assembling
/// the final [`StepResponse`].
///
/// Text and tool-call fragments are forwarded to `wire` as they arrive so
/// the UI renders output incrementally. Forwarding happens before the
/// stream is known to complete: when a step fails mid-stream and is
/// retried, the fragments of the interrupted attempt have already been
/// delivered, and the retried attempt streams from the start again.
///
/// # Errors
///
/// `ClientError::EmptyResponse` (retryable) when the stream ends with
/// neither text nor tool calls, or the forwarded error on
/// [`StreamEvent::Failed`].
pub async fn collect_step(
    mut rx: mpsc::Receiver<StreamEvent>,
    wire: &WireHandle,
) -> Result<StepResponse> {
    let mut content = String::new();
    let mut usage = None;
    // Stream indices are small and dense; a Vec keyed by index keeps the
    // calls in request order for free.
    let mut pending: Vec<PendingCall> = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextFragment(text) => {
                wire.send(AgentEvent::TextFragment(text.clone()));
                content.push_str(&text);
            }
            StreamEvent::ToolCallFragment {
                index,
                id,
                name,
                arguments,
            } => {
                wire.send(AgentEvent::ToolCallFragment {
                    id: id.clone(),
                    name: name.clone(),
                    fragment: arguments.clone(),
                });
                if pending.len() <= index {
                    pending.resize_with(index + 1, PendingCall::default);
                }
                let call = &mut pending[index];
                if let Some(id) = id {
                    call.id = id;
                }
                if let Some(name) = name {
                    call.name = name;
                }
                call.arguments.push_str(&arguments);
            }
            StreamEvent::Usage(u) => usage = Some(u),
            StreamEvent::Failed(err) => return Err(err.into()),
        }
    }

    let tool_calls: Vec<ToolCall> = pending
        .into_iter()
        .filter(|c| !c.name.is_empty())
        .map(|c| ToolCall {
            id: c.id,
            name: c.name,
            arguments: c.arguments,
        })
        .collect();

    if content.is_empty() && tool_calls.is_empty() {
        return Err(ClientError::EmptyResponse.into());
    }

    Ok(StepResponse {
        content,
        tool_calls,
        usage,
    })
}
