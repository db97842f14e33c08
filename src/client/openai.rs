//! OpenAI-compatible chat client.
//!
//! Implements [`ChatClient`] against the Chat Completions streaming API
//! (SSE). Works with any endpoint speaking the same dialect by overriding
//! the base URL.
//!
//! # Example
//!
//! ```rust,ignore
//! use soulwire::client::{ChatClient, OpenAiClient};
//!
//! let client = OpenAiClient::new("your-api-key")
//!     .with_model("gpt-4o-mini");
//! let rx = client.stream_step("You are helpful.", &[], &history).await?;
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{classify_status, ClientError, Result};
use crate::history::{Message, Role};

use super::{ChatClient, StreamEvent, ToolDefinition, Usage};

/// Default API endpoint.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Default model when config does not name one.
const DEFAULT_MODEL: &str = "gpt-4o";

// ============================================================================
// Request Types
// ============================================================================

/// Chat Completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
    /// Asks the endpoint to append a usage chunk to the stream.
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

/// A message in the endpoint's format.
#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    r#type: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// Streaming Response Types
// ============================================================================

/// One SSE chunk of a streaming response.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ============================================================================
// Client
// ============================================================================

/// Chat client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    api_key: String,
    api_url: String,
    model: String,
    http: Client,
}

impl OpenAiClient {
    /// Create a client with the default endpoint and model.
    ///
    /// # Arguments
    /// * `api_key` - Bearer token for the endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: OPENAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http: Client::new(),
        }
    }

    /// Override the API base URL (for compatible endpoints or proxies).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_request(
        &self,
        system_prompt: &str,
        tools: &[ToolDefinition],
        history: &[Message],
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: Some(system_prompt.to_string()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        for msg in history {
            messages.push(convert_message(msg));
        }

        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| WireTool {
                        r#type: "function",
                        function: WireFunctionDef {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        ChatRequest {
            model: self.model.clone(),
            messages,
            tools,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        }
    }
}

/// Convert a history message to the endpoint's wire format.
fn convert_message(msg: &Message) -> WireMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let text = msg.text();
    let tool_calls = msg.tool_calls();

    WireMessage {
        role,
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(
                tool_calls
                    .into_iter()
                    .map(|c| WireToolCall {
                        id: c.id,
                        r#type: "function",
                        function: WireFunctionCall {
                            name: c.name,
                            arguments: c.arguments,
                        },
                    })
                    .collect(),
            )
        },
        tool_call_id: msg.tool_call_id.clone(),
    }
}

/// Map a reqwest transport error to a [`ClientError`].
fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(err.to_string())
    } else {
        ClientError::Connection(err.to_string())
    }
}

/// Translate one parsed SSE chunk into stream events.
fn chunk_events(chunk: StreamChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content {
            if !text.is_empty() {
                events.push(StreamEvent::TextFragment(text));
            }
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match delta.function {
                Some(f) => (f.name, f.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            events.push(StreamEvent::ToolCallFragment {
                index: delta.index,
                id: delta.id,
                name,
                arguments,
            });
        }
    }
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }));
    }
    events
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn stream_step(
        &self,
        system_prompt: &str,
        tools: &[ToolDefinition],
        history: &[Message],
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let request = self.build_request(system_prompt, tools, history);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Starting streaming chat completion"
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body).into());
        }

        let (tx, rx) = mpsc::channel(64);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            // SSE frames can split mid-line across network chunks; buffer
            // until a newline completes each `data:` line.
            let mut buffer = String::new();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let _ = tx.send(StreamEvent::Failed(map_transport_error(err))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(parsed) => {
                            for event in chunk_events(parsed) {
                                if tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(err) => {
                            debug!(error = %err, "Skipping unparseable stream chunk");
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}
