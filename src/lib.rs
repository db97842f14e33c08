//! soulwire - agent execution runtime with checkpoints and time travel

pub mod agent;
pub mod approval;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod timetravel;
pub mod tools;
pub mod utils;
pub mod wire;

pub use agent::{run_agent, AgentLoop, RunOutcome, UiConsumer};
pub use approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
pub use client::{ChatClient, OpenAiClient, RetryPolicy, StreamEvent, ToolDefinition, Usage};
pub use config::Config;
pub use error::{ClientError, Result, SoulError};
pub use history::{Context, Message, Role, ToolCall, ToolOutcome, ToolResult};
pub use timetravel::{DMail, TimeTravel};
pub use wire::{AgentEvent, StatusSnapshot, Wire, WireHandle};
