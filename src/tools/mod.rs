//! Tools module - tool definitions and execution for model function calling
//!
//! This module provides the infrastructure for defining and executing tools
//! the model can call during a run. Concrete tool bodies (shell, file I/O)
//! are pluggable collaborators; the runtime ships only two built-ins.
//!
//! # Overview
//!
//! - [`Tool`] trait: the interface every tool implements
//! - [`ToolInvocation`]: per-call context (tool-call id, workspace)
//! - [`Dependencies`] + [`ToolBuilder`]: typed constructor injection
//! - [`ToolRegistry`]: the shipped [`Toolset`] implementation
//!
//! # Built-in Tools
//!
//! - [`EchoTool`]: trivial tool used by tests and demos
//! - [`SendDmailTool`]: the model's handle on time travel
//!
//! # Example
//!
//! ```rust
//! use soulwire::tools::{ToolInvocation, ToolRegistry, Toolset, EchoTool};
//! use std::path::PathBuf;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ToolRegistry::new();
//! registry.register(Box::new(EchoTool));
//!
//! let invocation = ToolInvocation {
//!     call_id: "call_1".to_string(),
//!     workspace: PathBuf::from("/tmp"),
//! };
//! let result = registry
//!     .invoke("echo", r#"{"text":"Hello!"}"#, &invocation)
//!     .await;
//! assert!(!result.outcome.is_error());
//! # });
//! ```

pub mod dmail;
pub mod echo;
mod registry;
mod types;

pub use dmail::SendDmailTool;
pub use echo::EchoTool;
pub use registry::{ToolRegistry, Toolset};
pub use types::{Dependencies, Tool, ToolBuilder, ToolInvocation, ToolOutput};
