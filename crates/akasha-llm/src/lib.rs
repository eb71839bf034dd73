//! # akasha-llm
//!
//! LLM provider adapters (Gemini, OpenAI) with a bounded tool-calling
//! loop, API key rotation, provider routing with fallback, and the web
//! search tool the loop calls into.

pub mod classify;
pub mod gemini;
pub mod openai;
pub mod rotator;
pub mod router;
pub mod search;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use rotator::KeyRotator;
pub use router::ProviderRouter;
pub use search::GoogleSearch;

/// Results requested per `web_search` tool invocation.
pub const TOOL_SEARCH_RESULTS: usize = 5;

/// Description advertised to the model for the `web_search` tool.
pub(crate) const WEB_SEARCH_DESCRIPTION: &str =
    "Search the web for current information. Use this when you need up-to-date \
     information, recent news, or facts you're not certain about.";

/// JSON schema for the `web_search` tool parameters, shared by both vendors.
pub(crate) fn web_search_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query to look up"
            }
        },
        "required": ["query"]
    })
}
