use crate::{
    error::{AkashaError, ProviderError},
    message::{
        Completion, CompletionRequest, GenerateRequest, HistoryMessage, MediaPayload,
        OutboundDispatch, SearchResult, SendReceipt,
    },
};
use async_trait::async_trait;

/// LLM provider trait — the brain.
///
/// Every AI backend (Gemini, OpenAI) implements this trait. Key rotation
/// state lives inside the provider; the router drives it via `rotate_key`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Number of API keys in this provider's rotation pool.
    fn key_count(&self) -> usize;

    /// Advance to the next key in the pool (circular).
    fn rotate_key(&self);

    /// Run the bounded tool-calling loop and return the final answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;

    /// Plain generation with no tool access.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError>;
}

/// Messaging gateway trait — the hands.
///
/// Implemented by the GoWA bridge client; mocked in tests.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a message, optionally as a reply.
    async fn send(&self, dispatch: &OutboundDispatch) -> Result<SendReceipt, AkashaError>;

    /// Download media for a message through the on-demand API.
    async fn download(&self, message_id: &str, phone: &str) -> Result<MediaPayload, AkashaError>;

    /// Fetch a file the bridge already stored at a static path.
    async fn download_from_path(&self, file_path: &str) -> Result<MediaPayload, AkashaError>;

    /// Fetch the most recent messages of a chat.
    async fn fetch_history(
        &self,
        chat_jid: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, AkashaError>;

    /// Whether the bridge has a connected device.
    async fn check_health(&self) -> bool;
}

/// Web search trait used by the tool-calling loop.
///
/// Failures degrade to an empty result list; the reply still goes out
/// without sources rather than erroring the whole exchange.
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}
