//! Chat client abstraction and the default OpenAI-compatible implementation.
//!
//! The runtime treats any [`ChatClient`] as opaque: one streaming call per
//! step, yielding [`StreamEvent`]s that the loop forwards to the wire while
//! assembling a [`StepResponse`]. Retry with exponential backoff lives in
//! [`retry`], classification in [`crate::error::ClientError`].

pub mod openai;
pub mod retry;
pub mod types;

pub use openai::OpenAiClient;
pub use retry::RetryPolicy;
pub use types::{collect_step, ChatClient, StepResponse, StreamEvent, ToolDefinition, Usage};
