//! Conversation history: message data model and the checkpointable context.
//!
//! [`Message`] and friends are the serde-round-trippable conversation record;
//! [`Context`] is the single-writer, checkpointable container the agent loop
//! owns. Persistence of history across process runs is an external
//! collaborator built on the serde impls here.

pub mod context;
pub mod types;

pub use context::Context;
pub use types::{ContentPart, Message, Role, ToolCall, ToolOutcome, ToolResult};
