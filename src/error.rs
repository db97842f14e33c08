//! Error types for soulwire.
//!
//! This module defines all error types used throughout the runtime. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! The taxonomy distinguishes three classes:
//!
//! - **Fatal** errors abort the run (`Config`, `Checkpoint`, `MaxSteps`,
//!   and exhausted client errors).
//! - **Retryable transport** errors ([`ClientError`] where
//!   [`ClientError::is_retryable`] holds) are retried with backoff before
//!   becoming fatal.
//! - **Recoverable tool-level** errors (`Tool`, `Rejected`, `Dmail`) are
//!   converted into tool-result messages fed back to the model and never
//!   abort the run.
//!
//! Cancellation is *not* an error; it is a terminal
//! [`RunOutcome`](crate::agent::RunOutcome) variant.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Chat Client Error Classification
// ============================================================================

/// Structured classification of chat client transport failures.
///
/// Distinguishes the error kinds the retry policy cares about without
/// string matching: connection failures, timeouts, empty responses, and
/// HTTP status-coded failures.
#[derive(Debug)]
pub enum ClientError {
    /// Could not reach the endpoint (DNS, TCP, TLS, connection reset).
    Connection(String),
    /// Connect or read timeout.
    Timeout(String),
    /// The model returned neither text nor tool calls.
    EmptyResponse,
    /// HTTP status-coded failure with the response body.
    Status { code: u16, message: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connection(msg) => write!(f, "connection failure: {}", msg),
            ClientError::Timeout(msg) => write!(f, "timeout: {}", msg),
            ClientError::EmptyResponse => write!(f, "empty response from model"),
            ClientError::Status { code, message } => write!(f, "HTTP {}: {}", code, message),
        }
    }
}

impl ClientError {
    /// Returns `true` if this error is transient and the request should be
    /// retried.
    ///
    /// Retryable: connection failures, timeouts, empty responses, and
    /// HTTP 429/500/502/503/504.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connection(_) | ClientError::Timeout(_) | ClientError::EmptyResponse => {
                true
            }
            ClientError::Status { code, .. } => {
                matches!(code, 429 | 500 | 502 | 503 | 504)
            }
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Map an HTTP status code and response body into a [`ClientError`].
///
/// Centralized so every client implementation classifies consistently.
pub fn classify_status(code: u16, body: &str) -> ClientError {
    ClientError::Status {
        code,
        message: body.to_string(),
    }
}

impl From<ClientError> for SoulError {
    fn from(err: ClientError) -> Self {
        SoulError::Client(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for soulwire operations.
#[derive(Error, Debug)]
pub enum SoulError {
    /// Configuration errors: no chat client configured, invalid config file,
    /// unsupported capability. Fatal; the run aborts immediately.
    #[error("configuration error: {0}")]
    Config(String),

    /// Typed chat client transport error. Retried when
    /// [`ClientError::is_retryable`]; fatal once retries are exhausted.
    #[error("client error: {0}")]
    Client(ClientError),

    /// Tool execution failure. Recoverable: fed back to the model as a tool
    /// result.
    #[error("tool error: {0}")]
    Tool(String),

    /// A human rejected the tool's approval request. Recoverable.
    #[error("approval rejected: {0}")]
    Rejected(String),

    /// Invalid DMail (already pending, or bad target checkpoint).
    /// Recoverable: returned to the calling tool.
    #[error("dmail error: {0}")]
    Dmail(String),

    /// Invalid checkpoint id passed to a revert. Programmer error; fatal.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The step budget was exhausted without the model finishing. Fatal.
    #[error("maximum step count ({0}) exceeded")]
    MaxSteps(u32),

    /// A tool asked for a dependency that was never registered. Fatal at
    /// startup.
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),

    /// Standard I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SoulError {
    /// Returns `true` if this error should be fed back to the model as a
    /// tool result instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SoulError::Tool(_) | SoulError::Rejected(_) | SoulError::Dmail(_)
        )
    }
}

/// A specialized `Result` type for soulwire operations.
pub type Result<T> = std::result::Result<T, SoulError>;
