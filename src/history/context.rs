//! Checkpointable conversation context.
//!
//! [`Context`] holds the ordered message history along with a table of
//! checkpoints (message-count boundaries) that support point-in-time
//! rollback. It is single-writer: the agent loop owns it exclusively and
//! mutates it between steps, never concurrently.

use crate::error::{Result, SoulError};
use crate::history::types::Message;

/// Fallback per-message token estimate used when the client has not yet
/// reported real usage. The constant is a rough average; it is tunable
/// through config.
pub const DEFAULT_TOKENS_PER_MESSAGE: usize = 200;

/// Ordered conversation history with checkpoint support.
#[derive(Debug, Clone, Default)]
pub struct Context {
    messages: Vec<Message>,
    /// Last token count reported by the chat client; 0 until the first
    /// response arrives.
    token_count: usize,
    /// Message-count boundaries. Index into this table is the checkpoint id,
    /// so ids are dense and monotonic from 0.
    checkpoints: Vec<usize>,
    tokens_per_message: usize,
}

impl Context {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            token_count: 0,
            checkpoints: Vec::new(),
            tokens_per_message: DEFAULT_TOKENS_PER_MESSAGE,
        }
    }

    /// Override the per-message token heuristic used before real usage
    /// numbers arrive.
    pub fn with_tokens_per_message(mut self, tokens: usize) -> Self {
        self.tokens_per_message = tokens;
        self
    }

    /// Append a message to the history.
    ///
    /// Messages are immutable once appended; there is no editing API.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Borrow the full message history in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record a checkpoint at the current history length.
    ///
    /// # Returns
    ///
    /// The new checkpoint's id. Ids are dense: the first checkpoint is 0,
    /// the next 1, and so on.
    pub fn checkpoint(&mut self) -> usize {
        self.checkpoints.push(self.messages.len());
        self.checkpoints.len() - 1
    }

    /// Number of checkpoints currently recorded.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Rewind the history to the state it had when `id` was recorded.
    ///
    /// Truncates the message list to exactly the recorded boundary and drops
    /// every checkpoint recorded after `id`, so ids stay dense against the
    /// shortened history.
    ///
    /// # Errors
    ///
    /// `SoulError::Checkpoint` if `id` was never issued. That is a
    /// programmer error and fatal to the run.
    pub fn revert_to(&mut self, id: usize) -> Result<()> {
        let boundary = *self.checkpoints.get(id).ok_or_else(|| {
            SoulError::Checkpoint(format!(
                "checkpoint {} does not exist (have {})",
                id,
                self.checkpoints.len()
            ))
        })?;
        self.messages.truncate(boundary);
        self.checkpoints.truncate(id + 1);
        Ok(())
    }

    /// Record the token count reported by the chat client.
    pub fn update_token_count(&mut self, tokens: usize) {
        self.token_count = tokens;
    }

    /// Current token estimate: the last client-reported count, or the
    /// per-message heuristic before any response has arrived.
    pub fn estimated_tokens(&self) -> usize {
        if self.token_count > 0 {
            self.token_count
        } else {
            self.messages.len() * self.tokens_per_message
        }
    }

    /// Fraction of the context window in use, clamped to `[0, 1]`.
    pub fn usage_ratio(&self, max_context_tokens: usize) -> f32 {
        if max_context_tokens == 0 {
            return 1.0;
        }
        let ratio = self.estimated_tokens() as f32 / max_context_tokens as f32;
        ratio.min(1.0)
    }

    /// Replace the entire history, typically after compaction.
    ///
    /// Clears messages, token count, and every checkpoint, establishes a
    /// fresh checkpoint 0 at length 0, then appends `history`. All earlier
    /// checkpoint ids are invalidated by this call.
    pub fn rebuild(&mut self, history: Vec<Message>) {
        self.messages.clear();
        self.checkpoints.clear();
        self.token_count = 0;
        self.checkpoints.push(0);
        self.messages.extend(history);
    }

    /// Take the full history out, leaving the context untouched otherwise.
    /// Used by the compactor, which hands a rebuilt history back through
    /// [`Context::rebuild`].
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
