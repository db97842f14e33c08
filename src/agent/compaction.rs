//! Context compaction: summarize old history into a single message.
//!
//! When the context approaches the model's window, everything except the
//! most recent user/assistant exchanges is serialized into a transcript,
//! summarized by the chat client, and replaced with one assistant message
//! carrying the summary. The agent loop brackets the operation with
//! `CompactionBegin`/`CompactionEnd` wire events and rebuilds the context
//! afterwards.

use tracing::info;

use crate::client::{ChatClient, StreamEvent};
use crate::error::{ClientError, Result};
use crate::history::{ContentPart, Message, Role};

/// Prefix on the summary message so the model recognizes it as condensed
/// earlier conversation.
pub const SUMMARY_PREFIX: &str = "[Conversation Summary]";

const SUMMARIZER_SYSTEM_PROMPT: &str =
    "You condense conversation transcripts. Reply with only the summary.";

/// Find the index where the preserved tail begins: scanning from the end,
/// the position of the `preserve_recent`-th user/assistant message.
///
/// Returns `None` when there are not enough eligible messages to both
/// preserve a tail and leave something to summarize.
fn preserve_boundary(history: &[Message], preserve_recent: usize) -> Option<usize> {
    if preserve_recent == 0 {
        return if history.is_empty() { None } else { Some(0) };
    }

    let mut seen = 0;
    for (idx, msg) in history.iter().enumerate().rev() {
        if matches!(msg.role, Role::User | Role::Assistant) {
            seen += 1;
            if seen == preserve_recent {
                // Nothing before the boundary means nothing to summarize.
                return if idx == 0 { None } else { Some(idx) };
            }
        }
    }
    None
}

/// Build a prompt asking the client to summarize a set of messages.
///
/// # Examples
/// ```
/// use soulwire::history::Message;
/// use soulwire::agent::compaction::build_summary_prompt;
///
/// let msgs = vec![
///     Message::user("Hello"),
///     Message::assistant("Hi there!"),
/// ];
/// let prompt = build_summary_prompt(&msgs);
/// assert!(prompt.contains("user: Hello"));
/// assert!(prompt.contains("assistant: Hi there!"));
/// ```
pub fn build_summary_prompt(messages: &[Message]) -> String {
    let mut transcript = String::new();
    for msg in messages {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        transcript.push_str(&format!("{}: {}\n", role, render_content(msg)));
    }

    format!(
        "Summarize the following conversation focusing on key decisions, \
         information exchanged, and actions taken. Be concise.\n\n{}",
        transcript
    )
}

/// Render a message's content for the transcript, noting tool calls.
fn render_content(msg: &Message) -> String {
    let mut out = String::new();
    for part in &msg.content {
        match part {
            ContentPart::Text { text } => out.push_str(text),
            ContentPart::ToolCall { name, arguments, .. } => {
                out.push_str(&format!(" [called {}({})]", name, arguments));
            }
            ContentPart::ToolCallDelta { .. } => {}
            ContentPart::Image { url } => out.push_str(&format!(" [image {}]", url)),
        }
    }
    out
}

/// Run one non-streaming-shaped completion: drain the stream into a string.
async fn complete_text(client: &dyn ChatClient, prompt: &str) -> Result<String> {
    let mut rx = client
        .stream_step(SUMMARIZER_SYSTEM_PROMPT, &[], &[Message::user(prompt)])
        .await?;

    let mut text = String::new();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextFragment(fragment) => text.push_str(&fragment),
            StreamEvent::Failed(err) => return Err(err.into()),
            _ => {}
        }
    }
    if text.is_empty() {
        return Err(ClientError::EmptyResponse.into());
    }
    Ok(text)
}

/// Compact the history, preserving the most recent exchanges.
///
/// Everything before the preservation boundary is summarized by the client
/// into one assistant message prefixed with [`SUMMARY_PREFIX`], which is
/// prepended to the preserved tail.
///
/// # Arguments
/// * `history` - The full conversation history
/// * `client` - Chat client used for the summarization call
/// * `preserve_recent` - How many recent user/assistant messages survive
///   verbatim (tool messages in the tail survive with them)
///
/// # Returns
/// The compacted history, or the input unchanged when there is nothing to
/// summarize.
pub async fn compact(
    history: Vec<Message>,
    client: &dyn ChatClient,
    preserve_recent: usize,
) -> Result<Vec<Message>> {
    let Some(boundary) = preserve_boundary(&history, preserve_recent) else {
        return Ok(history);
    };

    let (head, tail) = history.split_at(boundary);
    let prompt = build_summary_prompt(head);
    let summary = complete_text(client, &prompt).await?;
    info!(
        summarized = head.len(),
        preserved = tail.len(),
        "Compacted conversation history"
    );

    let mut result = Vec::with_capacity(tail.len() + 1);
    result.push(Message::assistant(format!("{} {}", SUMMARY_PREFIX, summary)));
    result.extend_from_slice(tail);
    Ok(result)
}
