//! Configuration management for soulwire.
//!
//! Configuration is loaded from `~/.soulwire/config.json` with environment
//! variable overrides following the pattern `SOULWIRE_SECTION_KEY`.

mod types;

pub use types::*;

use crate::error::Result;
use std::path::{Path, PathBuf};

impl Config {
    /// Returns the soulwire configuration directory path (`~/.soulwire`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".soulwire")
    }

    /// Returns the path to the config file (`~/.soulwire/config.json`).
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// A missing config file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_MODEL") {
            self.agent.model = Some(val);
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_SYSTEM_PROMPT") {
            self.agent.system_prompt = val;
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_MAX_STEPS") {
            if let Ok(v) = val.parse() {
                self.agent.max_steps = v;
            }
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_MAX_CONTEXT_TOKENS") {
            if let Ok(v) = val.parse() {
                self.agent.max_context_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_RESERVED_TOKENS") {
            if let Ok(v) = val.parse() {
                self.agent.reserved_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_PRESERVE_RECENT") {
            if let Ok(v) = val.parse() {
                self.agent.preserve_recent = v;
            }
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_AUTO_APPROVE") {
            if let Ok(v) = val.parse() {
                self.agent.auto_approve = v;
            }
        }
        if let Ok(val) = std::env::var("SOULWIRE_AGENT_WORKSPACE") {
            self.agent.workspace = val;
        }

        if let Ok(val) = std::env::var("SOULWIRE_CLIENT_API_KEY") {
            self.client.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("SOULWIRE_CLIENT_API_BASE") {
            self.client.api_base = Some(val);
        }
        if let Ok(val) = std::env::var("SOULWIRE_CLIENT_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.client.max_retries = v;
            }
        }

        if let Ok(val) = std::env::var("SOULWIRE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SOULWIRE_LOG_FORMAT") {
            if let Ok(format) = serde_json::from_value(serde_json::Value::String(val)) {
                self.logging.format = format;
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::path())
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
