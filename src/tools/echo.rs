//! Echo tool: returns its input. Used by tests and demos.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SoulError};

use super::types::{Tool, ToolInvocation, ToolOutput};

/// A trivial tool that echoes its `text` argument back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the given text back verbatim."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to echo back"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value, _invocation: &ToolInvocation) -> Result<ToolOutput> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SoulError::Tool("echo requires a 'text' argument".to_string()))?;
        Ok(ToolOutput::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_input() {
        let inv = ToolInvocation::new("call_1");
        let out = EchoTool
            .execute(serde_json::json!({"text": "hello"}), &inv)
            .await
            .unwrap();
        assert_eq!(out.output, "hello");
    }

    #[tokio::test]
    async fn test_echo_missing_text_is_tool_error() {
        let inv = ToolInvocation::new("call_1");
        let err = EchoTool
            .execute(serde_json::json!({}), &inv)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }
}
