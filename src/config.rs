//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use agent_stream::{ChatApiConfig, DEFAULT_BASE_URL};
use conversation_store::default_state_path;
use thiserror::Error;

pub const BASE_URL_ENV: &str = "AGENT_CHAT_BASE_URL";
pub const STATE_PATH_ENV: &str = "AGENT_CHAT_STATE_PATH";
pub const TIMEOUT_ENV: &str = "AGENT_CHAT_TIMEOUT_SEC";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: String,
    pub state_path: PathBuf,
    /// Whole-request timeout. Unset means the stream may run indefinitely.
    pub timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_string_opt(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let state_path = env_string_opt(STATE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_state_path);
        let timeout = match env_string_opt(TIMEOUT_ENV) {
            Some(value) => Some(parse_timeout(&value)?),
            None => None,
        };

        Ok(Self {
            base_url,
            state_path,
            timeout,
        })
    }

    pub fn api_config(&self) -> ChatApiConfig {
        let config = ChatApiConfig::new(self.base_url.clone());
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            key: TIMEOUT_ENV,
            value: value.to_string(),
        }),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
