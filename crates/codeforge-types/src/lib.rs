//! CodeForge Types - Pure type definitions
//!
//! Data model and wire shapes shared by the orchestration core and the CLI.
//! Nothing in this crate performs I/O.

pub mod action;
pub mod message;
pub mod terminal;

pub use action::*;
pub use message::*;
pub use terminal::*;

use serde::{Deserialize, Serialize};

/// Default backend origin
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Generation engine selected for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Gpt,
    Claude,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Gpt => "gpt",
            ModelProvider::Claude => "claude",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpt" | "openai" => Some(ModelProvider::Gpt),
            "claude" | "anthropic" => Some(ModelProvider::Claude),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown model provider: {} (expected gpt or claude)", s))
    }
}

/// Settings persisted to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    pub server_url: String,
    #[serde(default)]
    pub default_model_provider: ModelProvider,
    /// Execute an artifact as soon as generation returns it
    #[serde(default = "default_auto_execute")]
    pub auto_execute: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub last_session_id: Option<String>,
}

fn default_auto_execute() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_model_provider: ModelProvider::default(),
            auto_execute: default_auto_execute(),
            connect_timeout_secs: default_connect_timeout(),
            last_session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_provider_parse() {
        assert_eq!(ModelProvider::parse("gpt"), Some(ModelProvider::Gpt));
        assert_eq!(ModelProvider::parse("Claude"), Some(ModelProvider::Claude));
        assert_eq!(ModelProvider::parse("anthropic"), Some(ModelProvider::Claude));
        assert_eq!(ModelProvider::parse("gemini"), None);
        assert!("llama".parse::<ModelProvider>().is_err());
    }

    #[test]
    fn test_settings_fill_defaults_from_partial_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"version":"1.0.0","server_url":"http://sandbox:9000"}"#)
                .unwrap();
        assert_eq!(settings.server_url, "http://sandbox:9000");
        assert_eq!(settings.default_model_provider, ModelProvider::Gpt);
        assert!(settings.auto_execute);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert!(settings.last_session_id.is_none());
    }
}
