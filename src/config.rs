use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// How `/answer` responses are delivered. Both modes produce identical
/// final text; streaming additionally surfaces tokens as they arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Buffered,
    Streaming,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Chat completion model used to answer questions
    pub model: String,
    /// Preferred caption language
    pub lang: String,
    /// Buffered or streaming answer delivery
    pub response_mode: ResponseMode,
    /// Address the API server binds to
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            lang: "en".to_string(),
            response_mode: ResponseMode::default(),
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Load config from ~/.config/ytqa/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytqa")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
model = "gpt-4o-mini"
lang = "es"
response_mode = "streaming"
bind = "0.0.0.0:8080"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.lang, "es");
        assert_eq!(config.response_mode, ResponseMode::Streaming);
        assert_eq!(config.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.response_mode, ResponseMode::Buffered);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"lang = "fr""#).unwrap();
        assert_eq!(config.lang, "fr");
        assert_eq!(config.model, "gpt-4o");
    }
}
