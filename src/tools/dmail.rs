//! The `send_dmail` tool: the model's handle on time travel.
//!
//! Sending a DMail does not interrupt the current step; the tool returns
//! normally and the agent loop intercepts the pending DMail at the end of
//! the step, discarding the rest of the turn.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SoulError};
use crate::timetravel::{DMail, TimeTravel};

use super::types::{Dependencies, Tool, ToolBuilder, ToolInvocation, ToolOutput};

#[derive(Debug, Deserialize)]
struct SendDmailArgs {
    checkpoint: usize,
    message: String,
}

/// Queue a rollback directive to an earlier checkpoint.
#[derive(Debug)]
pub struct SendDmailTool {
    timetravel: Arc<TimeTravel>,
}

impl SendDmailTool {
    pub fn new(timetravel: Arc<TimeTravel>) -> Self {
        Self { timetravel }
    }
}

impl ToolBuilder for SendDmailTool {
    fn build(deps: &Dependencies) -> Result<Self> {
        Ok(Self::new(deps.get::<TimeTravel>()?))
    }
}

#[async_trait]
impl Tool for SendDmailTool {
    fn name(&self) -> &str {
        "send_dmail"
    }

    fn description(&self) -> &str {
        "Rewind the conversation to an earlier checkpoint and replay from there \
         with a new directive. The directive is injected as a user message at \
         the restored point. Only one dmail can be pending at a time."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "checkpoint": {
                    "type": "integer",
                    "description": "The checkpoint id to rewind to"
                },
                "message": {
                    "type": "string",
                    "description": "Directive to inject after the rewind"
                }
            },
            "required": ["checkpoint", "message"]
        })
    }

    async fn execute(&self, args: Value, _invocation: &ToolInvocation) -> Result<ToolOutput> {
        let args: SendDmailArgs = serde_json::from_value(args)
            .map_err(|e| SoulError::Tool(format!("invalid send_dmail arguments: {}", e)))?;

        self.timetravel.send(DMail {
            target_checkpoint: args.checkpoint,
            message: args.message,
        })?;

        Ok(
            ToolOutput::new(format!(
                "dmail queued; the conversation will rewind to checkpoint {}",
                args.checkpoint
            ))
            .with_brief("dmail queued"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_dmail_queues() {
        let tt = Arc::new(TimeTravel::new());
        tt.sync_checkpoints(2);
        let tool = SendDmailTool::new(tt.clone());

        let inv = ToolInvocation::new("call_1");
        let out = tool
            .execute(
                serde_json::json!({"checkpoint": 1, "message": "redo with flag X"}),
                &inv,
            )
            .await
            .unwrap();
        assert!(out.output.contains("checkpoint 1"));

        let dmail = tt.fetch_pending().unwrap();
        assert_eq!(dmail.target_checkpoint, 1);
        assert_eq!(dmail.message, "redo with flag X");
    }

    #[tokio::test]
    async fn test_send_dmail_invalid_target_is_recoverable() {
        let tt = Arc::new(TimeTravel::new());
        tt.sync_checkpoints(1);
        let tool = SendDmailTool::new(tt);

        let inv = ToolInvocation::new("call_1");
        let err = tool
            .execute(
                serde_json::json!({"checkpoint": 9, "message": "too far"}),
                &inv,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SoulError::Dmail(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_build_from_dependencies() {
        let tt = Arc::new(TimeTravel::new());
        let mut deps = Dependencies::new();
        deps.insert(tt);

        assert!(SendDmailTool::build(&deps).is_ok());
    }

    #[tokio::test]
    async fn test_build_missing_dependency_fails_fast() {
        let deps = Dependencies::new();
        let err = SendDmailTool::build(&deps).unwrap_err();
        assert!(err.to_string().contains("TimeTravel"));
    }
}
