use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Reply agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Case-insensitive prefix that addresses the assistant.
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,
    /// Assistant personality, passed as the system instruction.
    #[serde(default = "default_reply_system")]
    pub system_instruction: String,
    /// Query used when an image arrives with an empty caption.
    #[serde(default = "default_image_query")]
    pub default_image_query: String,
    /// Tool-loop iteration budget per completion.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_phrase: default_trigger_phrase(),
            system_instruction: default_reply_system(),
            default_image_query: default_image_query(),
            max_tool_calls: default_max_tool_calls(),
        }
    }
}

/// Chat summarizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upper bound on how many messages one request may summarize.
    #[serde(default = "default_max_summary_messages")]
    pub max_messages: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: default_max_summary_messages(),
        }
    }
}

/// Daily broadcast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Recipient JIDs for the daily passage.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Local hour/minute the daily job fires.
    #[serde(default = "default_broadcast_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    /// Offset of the schedule's local time from UTC, in hours.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    /// Days of idempotency ledger history to keep.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Topic selection: "free" or "web_search".
    #[serde(default = "default_topic_mode")]
    pub topic_mode: String,
    #[serde(default = "default_topic_search_query")]
    pub topic_search_query: String,
    #[serde(default = "default_free_topic_prompt")]
    pub free_topic_prompt: String,
    #[serde(default = "default_passage_system")]
    pub system_instruction: String,
    #[serde(default = "default_news_passage_system")]
    pub news_system_instruction: String,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recipients: Vec::new(),
            hour: default_broadcast_hour(),
            minute: 0,
            utc_offset_hours: default_utc_offset_hours(),
            max_concurrent_sends: default_max_concurrent_sends(),
            retention_days: default_retention_days(),
            topic_mode: default_topic_mode(),
            topic_search_query: default_topic_search_query(),
            free_topic_prompt: default_free_topic_prompt(),
            system_instruction: default_passage_system(),
            news_system_instruction: default_news_passage_system(),
        }
    }
}
