//! Tool registry: the shipped [`Toolset`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ToolDefinition;
use crate::error::Result;
use crate::history::{ToolOutcome, ToolResult};

use super::types::{Dependencies, Tool, ToolBuilder, ToolInvocation};

/// The collaborator interface the agent loop dispatches tool calls through.
///
/// Implementations own name resolution and execution; the loop never sees
/// individual tools. Every failure mode (unknown tool, malformed
/// arguments, recoverable tool errors) surfaces as a [`ToolResult`] with an
/// error outcome, never as a loop-level error.
#[async_trait]
pub trait Toolset: Send + Sync {
    /// Definitions for every registered tool, sent to the model each step.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute one tool call.
    ///
    /// # Arguments
    /// * `name` - Tool name as requested by the model
    /// * `arguments` - Raw JSON arguments string from the model
    /// * `invocation` - Per-call context
    async fn invoke(&self, name: &str, arguments: &str, invocation: &ToolInvocation)
        -> ToolResult;
}

/// Central registry for managing and executing tools.
///
/// # Example
///
/// ```rust
/// use soulwire::tools::{ToolRegistry, EchoTool};
///
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(EchoTool));
/// assert!(registry.contains("echo"));
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name replaces the old one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        debug!(tool = tool.name(), "Registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Build a tool from the dependency registry and register it.
    ///
    /// # Errors
    ///
    /// Propagates `SoulError::MissingDependency` from the builder; callers
    /// fail fast at startup rather than at first invocation.
    pub fn register_with<T: ToolBuilder + 'static>(&mut self, deps: &Dependencies) -> Result<()> {
        let tool = T::build(deps)?;
        self.register(Box::new(tool));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl Toolset for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        // HashMap iteration order is arbitrary; keep the definition list
        // stable across steps.
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &str,
        invocation: &ToolInvocation,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "Model requested unknown tool");
            return ToolResult::error(
                invocation.call_id.clone(),
                format!("unknown tool: {}", name),
            );
        };

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(arguments) {
                Ok(value) => value,
                Err(err) => {
                    return ToolResult::error(
                        invocation.call_id.clone(),
                        format!("invalid tool arguments: {}", err),
                    );
                }
            }
        };

        debug!(tool = name, call_id = %invocation.call_id, "Executing tool");
        match tool.execute(args, invocation).await {
            Ok(output) => ToolResult {
                tool_call_id: invocation.call_id.clone(),
                outcome: ToolOutcome::Ok {
                    output: output.output,
                    brief: output.brief,
                },
            },
            Err(err) => {
                warn!(tool = name, error = %err, "Tool execution failed");
                ToolResult {
                    tool_call_id: invocation.call_id.clone(),
                    outcome: ToolOutcome::Error {
                        message: err.to_string(),
                        brief: None,
                        retryable: err.is_recoverable(),
                    },
                }
            }
        }
    }
}
