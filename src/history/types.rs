//! Core message types for conversation history.
//!
//! A [`Message`] is an immutable record of one conversational turn. Content
//! is a sequence of typed [`ContentPart`]s rather than a flat string so that
//! tool calls, streamed fragments, and images keep their structure through
//! serialization.

use serde::{Deserialize, Serialize};

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions from the runtime operator.
    System,
    /// Input from the human (or an injected rollback directive).
    User,
    /// Model output, including requested tool calls.
    Assistant,
    /// A tool result being fed back to the model.
    Tool,
}

/// One typed piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// A fully-assembled tool call requested by the assistant.
    ToolCall {
        id: String,
        name: String,
        /// Raw JSON arguments, exactly as produced by the model.
        arguments: String,
    },
    /// A streamed fragment of a tool call still being assembled. The
    /// runtime itself streams fragments as
    /// [`AgentEvent::ToolCallFragment`](crate::wire::AgentEvent); this part
    /// is the serializable form for collaborators that record raw streams.
    ToolCallDelta { id: String, fragment: String },
    /// An image reference.
    Image { url: String },
}

/// A single message in the conversation.
///
/// Messages are immutable once appended to a [`Context`](super::Context);
/// corrections happen by appending, never by editing in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    /// Set only on `Tool` messages: which call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a user message with plain text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_call_id: None,
        }
    }

    /// Create an assistant message with plain text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_call_id: None,
        }
    }

    /// Create a system message with plain text content.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying one model step: optional text
    /// plus the tool calls it requested.
    pub fn assistant_step(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut content = Vec::new();
        if let Some(text) = text {
            if !text.is_empty() {
                content.push(ContentPart::Text { text });
            }
        }
        for call in tool_calls {
            content.push(ContentPart::ToolCall {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            });
        }
        Self {
            role: Role::Assistant,
            content,
            tool_call_id: None,
        }
    }

    /// Create a tool-result message answering the given call.
    pub fn tool_result(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::Text { text: text.into() }],
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Concatenated text of all `Text` parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.content {
            if let ContentPart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }

    /// The tool calls carried by this message, if any.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall {
                    id,
                    name,
                    arguments,
                } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-assigned call id; ties the result back to the request.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments string.
    pub arguments: String,
}

/// The outcome of invoking a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool ran to completion.
    Ok {
        /// Full output fed back to the model.
        output: String,
        /// Optional short form for UI display.
        #[serde(skip_serializing_if = "Option::is_none")]
        brief: Option<String>,
    },
    /// The tool failed. Recoverable: the message is fed back to the model
    /// as the result of the call.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        brief: Option<String>,
        retryable: bool,
    },
}

impl ToolOutcome {
    /// The text fed back to the model for this outcome.
    pub fn feedback(&self) -> String {
        match self {
            ToolOutcome::Ok { output, .. } => output.clone(),
            ToolOutcome::Error { message, .. } => format!("Error: {}", message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }
}

/// A tool outcome paired with the call it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn ok(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            outcome: ToolOutcome::Ok {
                output: output.into(),
                brief: None,
            },
        }
    }

    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            outcome: ToolOutcome::Error {
                message: message.into(),
                brief: None,
                retryable: false,
            },
        }
    }

    /// Convert into the `Tool` message appended to history.
    pub fn into_message(self) -> Message {
        let text = self.outcome.feedback();
        Message::tool_result(self.tool_call_id, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "hello");
        assert!(msg.tool_call_id.is_none());

        let msg = Message::system("you are helpful");
        assert_eq!(msg.role, Role::System);

        let msg = Message::tool_result("call_1", "done");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.text(), "done");
    }

    #[test]
    fn test_assistant_step_content_order() {
        let msg = Message::assistant_step(
            Some("let me check".to_string()),
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "list_files".to_string(),
                arguments: "{}".to_string(),
            }],
        );
        assert_eq!(msg.content.len(), 2);
        assert!(matches!(msg.content[0], ContentPart::Text { .. }));
        assert!(matches!(msg.content[1], ContentPart::ToolCall { .. }));
        assert_eq!(msg.tool_calls().len(), 1);
        assert_eq!(msg.tool_calls()[0].name, "list_files");
    }

    #[test]
    fn test_assistant_step_empty_text_omitted() {
        let msg = Message::assistant_step(Some(String::new()), vec![]);
        assert!(msg.content.is_empty());
        let msg = Message::assistant_step(None, vec![]);
        assert!(msg.content.is_empty());
    }

    #[test]
    fn test_role_serialization_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = Message::assistant_step(
            Some("checking".to_string()),
            vec![ToolCall {
                id: "c1".to_string(),
                name: "echo".to_string(),
                arguments: r#"{"text":"hi"}"#.to_string(),
            }],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, msg);
    }

    #[test]
    fn test_tool_call_delta_roundtrip_excluded_from_text() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![
                ContentPart::Text {
                    text: "partial".to_string(),
                },
                ContentPart::ToolCallDelta {
                    id: "call_1".to_string(),
                    fragment: "{\"te".to_string(),
                },
            ],
            tool_call_id: None,
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("tool_call_delta"));
        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, msg);

        // A delta is neither text nor an assembled call.
        assert_eq!(msg.text(), "partial");
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_tool_outcome_feedback() {
        let ok = ToolOutcome::Ok {
            output: "files: a, b".to_string(),
            brief: None,
        };
        assert_eq!(ok.feedback(), "files: a, b");
        assert!(!ok.is_error());

        let err = ToolOutcome::Error {
            message: "not found".to_string(),
            brief: None,
            retryable: false,
        };
        assert_eq!(err.feedback(), "Error: not found");
        assert!(err.is_error());
    }

    #[test]
    fn test_tool_result_into_message() {
        let msg = ToolResult::error("call_9", "denied").into_message();
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(msg.text(), "Error: denied");
    }
}
