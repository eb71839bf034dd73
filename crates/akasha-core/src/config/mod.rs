mod defaults;
mod features;
mod providers;


pub use features::*;
pub use providers::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AkashaError;
use defaults::*;

/// Top-level Akasha configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub akasha: AkashaConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AkashaConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AkashaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Webhook server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// HMAC secret for `X-Hub-Signature-256` verification.
    /// Empty disables verification.
    #[serde(default)]
    pub webhook_secret: String,
    /// Per-sender webhook events allowed per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_secret: String::new(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

/// GoWA bridge connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Config {
    /// Fail-fast startup checks. The selected primary provider must have
    /// at least one API key; a misconfigured fallback only degrades.
    pub fn validate(&self) -> Result<(), AkashaError> {
        match self.provider.primary.as_str() {
            "gemini" => {
                if self.provider.gemini.api_keys.is_empty() {
                    return Err(AkashaError::Config(
                        "primary provider 'gemini' has no API keys configured".to_string(),
                    ));
                }
            }
            "openai" => {
                if self.provider.openai.api_keys.is_empty() {
                    return Err(AkashaError::Config(
                        "primary provider 'openai' has no API keys configured".to_string(),
                    ));
                }
            }
            other => {
                return Err(AkashaError::Config(format!(
                    "unknown provider '{other}', expected 'gemini' or 'openai'"
                )));
            }
        }

        if self.broadcast.hour > 23 || self.broadcast.minute > 59 {
            return Err(AkashaError::Config(format!(
                "invalid broadcast time {:02}:{:02}",
                self.broadcast.hour, self.broadcast.minute
            )));
        }

        Ok(())
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, AkashaError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| AkashaError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| AkashaError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
