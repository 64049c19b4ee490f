use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_SCANNER_CONFIG_PATH: &str = "config/scanner.toml";

/// Destination of signal messages: a numeric chat id or a public `@channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl FromStr for ChatTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChatTarget::Id(id));
        }
        match s.strip_prefix('@') {
            Some(name) if !name.is_empty() => Ok(ChatTarget::Username(s.to_string())),
            _ => Err(Error::Config(format!(
                "TELEGRAM_CHAT_ID must be a numeric id or an @channel name, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{id}"),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}

/// Secrets and endpoints loaded from environment variables at startup.
#[derive(Clone)]
pub struct Config {
    // Vision model
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: ChatTarget,
    /// Users allowed to send /start, /stop, /status. Empty disables the control bot.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Scanner config file path
    pub scanner_config_path: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"***")
            .field("gemini_model", &self.gemini_model)
            .field("telegram_token", &"***")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_allowed_user_ids", &self.telegram_allowed_user_ids)
            .field("scanner_config_path", &self.scanner_config_path)
            .finish()
    }
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Any missing required variable is an error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` is the production entry point.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Required environment variable '{key}' is not set. Check your .env file."
                    ))
                })
        };

        let telegram_allowed_user_ids = match lookup("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) => parse_user_ids(&raw)?,
            None => Vec::new(),
        };

        Ok(Config {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            telegram_token: required("TELEGRAM_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?.parse()?,
            telegram_allowed_user_ids,
            scanner_config_path: lookup("SCANNER_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_SCANNER_CONFIG_PATH.to_string()),
        })
    }
}

fn parse_user_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!(
                    "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'"
                ))
            })
        })
        .collect()
}
