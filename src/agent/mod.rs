//! Agent module - the step loop and run orchestration.
//!
//! The agent drives a conversational model through a multi-step
//! tool-calling loop, streaming intermediate output over the wire to a
//! decoupled UI consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  run_agent  │────>│  AgentLoop  │────>│  ChatClient │
//! │  (wiring)   │     │             │     │  (OpenAI)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ UiConsumer  │<────│    Wire     │     │   Toolset   │
//! │  (stdout)   │     │  (events)   │     │ (registry)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use soulwire::agent::{run_agent, AgentLoop};
//!
//! let outcome = run_agent(agent, "list my files", StdoutConsumer).await?;
//! ```

pub mod compaction;
mod r#loop;

pub use r#loop::{AgentLoop, RunOutcome};

use async_trait::async_trait;

use crate::error::Result;
use crate::wire::{AgentEvent, Wire};

/// The read side of the wire, implemented by the presentation layer.
///
/// Driven by [`run_agent`] until the wire closes. A consumer that handles
/// [`AgentEvent::ApprovalRequested`] resolves it back through the approval
/// gate.
#[async_trait]
pub trait UiConsumer: Send + 'static {
    /// Handle one event from the wire, in send order.
    async fn handle(&mut self, event: AgentEvent);
}

/// Run one user turn end to end.
///
/// Creates a fresh wire, spawns the consumer on its read side, drives the
/// loop with the write side, closes the wire when the loop finishes
/// (queued events still drain), and awaits the consumer before returning.
///
/// # Arguments
/// * `agent` - The configured loop; returned ownership lives with the caller
/// * `user_input` - The user's message
/// * `consumer` - The presentation layer for this run
pub async fn run_agent(
    agent: &mut AgentLoop,
    user_input: impl Into<String>,
    mut consumer: impl UiConsumer,
) -> Result<RunOutcome> {
    let (handle, mut wire) = Wire::new();

    let consumer_task = tokio::spawn(async move {
        while let Some(event) = wire.recv().await {
            consumer.handle(event).await;
        }
        consumer
    });

    let outcome = agent.run(user_input, &handle).await;
    handle.close();
    // The consumer drains whatever is still queued, then exits.
    let _ = consumer_task.await;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalGate;
    use crate::client::{ChatClient, StreamEvent, ToolDefinition};
    use crate::history::Message;
    use crate::timetravel::TimeTravel;
    use crate::tools::{EchoTool, ToolRegistry};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct OneLinerClient;

    #[async_trait]
    impl ChatClient for OneLinerClient {
        fn name(&self) -> &str {
            "one-liner"
        }
        fn default_model(&self) -> &str {
            "test-model"
        }
        async fn stream_step(
            &self,
            _system_prompt: &str,
            _tools: &[ToolDefinition],
            _history: &[Message],
        ) -> Result<tokio::sync::mpsc::Receiver<StreamEvent>> {
            let (tx, rx) = tokio::sync::mpsc::channel(4);
            tokio::spawn(async move {
                let _ = tx
                    .send(StreamEvent::TextFragment("short answer".to_string()))
                    .await;
            });
            Ok(rx)
        }
    }

    struct CountingConsumer {
        events: Arc<AtomicU32>,
    }

    #[async_trait]
    impl UiConsumer for CountingConsumer {
        async fn handle(&mut self, _event: AgentEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_run_agent_drives_consumer_until_close() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let (gate, queue) = ApprovalGate::new();
        let mut agent = AgentLoop::new(
            Arc::new(registry),
            gate,
            queue,
            Arc::new(TimeTravel::new()),
        )
        .with_client(Arc::new(OneLinerClient));

        let events = Arc::new(AtomicU32::new(0));
        let consumer = CountingConsumer {
            events: events.clone(),
        };

        let outcome = run_agent(&mut agent, "hi", consumer).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Finished { steps: 1, .. }));
        // At least StepBegin and the text fragment reached the consumer.
        assert!(events.load(Ordering::SeqCst) >= 2);
    }
}
