use serde::{Deserialize, Serialize};

use super::defaults::*;

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Primary provider: "gemini" or "openai".
    #[serde(default = "default_provider")]
    pub primary: String,
    /// Whether the other provider may be tried when the primary is exhausted.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary: default_provider(),
            fallback_enabled: true,
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Google Gemini settings. Multiple keys rotate on quota errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_gemini_model(),
        }
    }
}

/// OpenAI settings. Multiple keys rotate on quota errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_openai_model(),
            base_url: default_openai_base_url(),
        }
    }
}

/// Google Custom Search settings for the `web_search` tool.
/// Unconfigured search degrades to empty results, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub engine_id: String,
    #[serde(default = "default_search_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            engine_id: String::new(),
            max_results: default_search_results(),
        }
    }
}
