//! Configuration type definitions for soulwire.
//!
//! All types implement serde traits for JSON serialization and have
//! sensible defaults, so a partial config file works.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent loop knobs.
    #[serde(default)]
    pub agent: AgentDefaults,
    /// Chat client settings.
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent loop defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Model identifier; `None` uses the client's default.
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt sent with every model call.
    #[serde(default)]
    pub system_prompt: String,
    /// Step budget per run. Exceeding it is fatal.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Model context window size in tokens.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    /// Headroom reserved for the next response; compaction triggers when
    /// `estimated_tokens + reserved_tokens >= max_context_tokens`.
    #[serde(default = "default_reserved_tokens")]
    pub reserved_tokens: usize,
    /// How many recent user/assistant messages compaction preserves.
    #[serde(default = "default_preserve_recent")]
    pub preserve_recent: usize,
    /// Per-message token estimate used before the client reports real
    /// usage. A rough average, tunable per deployment.
    #[serde(default = "default_approx_tokens_per_message")]
    pub approx_tokens_per_message: usize,
    /// Skip human approval for all tool actions.
    #[serde(default)]
    pub auto_approve: bool,
    /// Workspace directory handed to tools.
    #[serde(default)]
    pub workspace: String,
}

fn default_max_steps() -> u32 {
    20
}
fn default_max_context_tokens() -> usize {
    128_000
}
fn default_reserved_tokens() -> usize {
    4_096
}
fn default_preserve_recent() -> usize {
    2
}
fn default_approx_tokens_per_message() -> usize {
    200
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: None,
            system_prompt: String::new(),
            max_steps: default_max_steps(),
            max_context_tokens: default_max_context_tokens(),
            reserved_tokens: default_reserved_tokens(),
            preserve_recent: default_preserve_recent(),
            approx_tokens_per_message: default_approx_tokens_per_message(),
            auto_approve: false,
            workspace: String::new(),
        }
    }
}

/// Chat client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key; usually supplied through the environment instead.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum retry attempts for transient model-call failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Backoff cap, in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_retry_max_delay_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable text.
    Text,
    /// Structured JSON lines for log aggregators.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Default filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path; `None` logs to stderr.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 20);
        assert_eq!(config.agent.max_context_tokens, 128_000);
        assert_eq!(config.agent.preserve_recent, 2);
        assert_eq!(config.agent.approx_tokens_per_message, 200);
        assert!(!config.agent.auto_approve);
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.client.retry_base_delay_ms, 1000);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"agent":{"max_steps":5}}"#).unwrap();
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.agent.max_context_tokens, 128_000);
        assert_eq!(config.client.max_retries, 3);
    }

    #[test]
    fn test_log_format_deserialize() {
        let cfg: LoggingConfig =
            serde_json::from_str(r#"{"format":"json","level":"debug"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level, "debug");
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.agent.model = Some("gpt-4o-mini".to_string());
        config.agent.auto_approve = true;
        config.client.api_base = Some("http://localhost:8080/v1".to_string());

        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.agent.model.as_deref(), Some("gpt-4o-mini"));
        assert!(restored.agent.auto_approve);
        assert_eq!(
            restored.client.api_base.as_deref(),
            Some("http://localhost:8080/v1")
        );
    }
}
