//! Tool types for soulwire.
//!
//! This module defines the `Tool` trait that all tools implement, the
//! `ToolInvocation` context passed to each call, and the typed
//! [`Dependencies`] registry tools draw their collaborators from at
//! construction time.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SoulError};

/// Dual-audience tool result.
///
/// `output` is what the model sees as the tool result; `brief` is an
/// optional short form for UI display.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Content fed back to the model. Always required.
    pub output: String,
    /// Short form for the UI. `None` means the UI shows nothing extra.
    pub brief: Option<String>,
}

impl ToolOutput {
    /// Result with model-facing content only.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            brief: None,
        }
    }

    /// Result with a separate short form for the UI.
    ///
    /// Use when the model needs verbose context (a JSON blob, raw data)
    /// but the UI should show a one-liner.
    pub fn with_brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }
}

/// Context for a single tool call.
///
/// Carries the model-assigned tool-call id explicitly; tools that need it
/// (approval requests, result correlation) read it from here rather than
/// from any ambient state.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    /// The model-assigned id of the call being executed.
    pub call_id: String,
    /// Workspace directory for file operations.
    pub workspace: PathBuf,
}

impl ToolInvocation {
    /// Create an invocation context for the given call.
    ///
    /// # Example
    /// ```
    /// use soulwire::tools::ToolInvocation;
    ///
    /// let inv = ToolInvocation::new("call_1").with_workspace("/tmp/project");
    /// assert_eq!(inv.call_id, "call_1");
    /// ```
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            workspace: PathBuf::new(),
        }
    }

    /// Set the workspace directory.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }
}

/// Trait that all tools must implement.
///
/// Tools are executable functions the model can call during a step.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use soulwire::tools::{Tool, ToolInvocation, ToolOutput};
/// use soulwire::error::Result;
///
/// struct MyTool;
///
/// #[async_trait]
/// impl Tool for MyTool {
///     fn name(&self) -> &str { "my_tool" }
///     fn description(&self) -> &str { "Does something useful" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({
///             "type": "object",
///             "properties": {},
///             "required": []
///         })
///     }
///     async fn execute(&self, _args: Value, _inv: &ToolInvocation) -> Result<ToolOutput> {
///         Ok(ToolOutput::new("Done!"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name; unique within a registry.
    fn name(&self) -> &str;

    /// Description sent to the model so it knows when to call the tool.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool.
    ///
    /// # Arguments
    /// * `args` - The parsed JSON arguments passed by the model
    /// * `invocation` - Per-call context (call id, workspace)
    ///
    /// # Errors
    ///
    /// Recoverable errors (`Tool`, `Rejected`, `Dmail`) are fed back to the
    /// model as an error result; they never abort the run.
    async fn execute(&self, args: Value, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Typed dependency registry for tool construction.
///
/// Collaborators (the approval gate, the time-travel controller, workspace
/// info) are registered once at startup and resolved by type. A missing
/// dependency fails fast at registration time, naming the missing type.
#[derive(Default)]
pub struct Dependencies {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared collaborator. A second insert of the same type
    /// replaces the first.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), value);
    }

    /// Resolve a collaborator by type.
    ///
    /// # Errors
    ///
    /// `SoulError::MissingDependency` naming the requested type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.clone().downcast::<T>().ok())
            .ok_or(SoulError::MissingDependency(std::any::type_name::<T>()))
    }
}

/// Constructor injection for tools.
///
/// Tools built through the registry's `register_with` pull their
/// collaborators out of [`Dependencies`] here, once, at startup.
pub trait ToolBuilder: Tool + Sized {
    /// Construct the tool from the dependency registry.
    ///
    /// # Errors
    ///
    /// `SoulError::MissingDependency` when a required collaborator was
    /// never registered.
    fn build(deps: &Dependencies) -> Result<Self>;
}
