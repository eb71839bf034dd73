//! Chat summarization triggered by the "akasha, summarize" command.

use akasha_core::{
    error::AkashaError,
    message::{GenerateRequest, HistoryMessage},
    traits::MessagingGateway,
};
use akasha_llm::ProviderRouter;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

const SUMMARIZE_TEMPERATURE: f32 = 0.3;

const SUMMARIZE_SYSTEM: &str = "You are a helpful assistant that summarizes chat conversations.\n\
Your summaries should:\n\
- Be in the same language as the original messages\n\
- Attribute statements to specific participants\n\
- Capture the essence of the discussion\n\
- Be neutral and factual";

/// Summarizes recent chat history on command.
pub struct ChatSummarizer {
    pattern: Regex,
    max_messages: usize,
    router: Arc<ProviderRouter>,
    bridge: Arc<dyn MessagingGateway>,
}

impl ChatSummarizer {
    pub fn new(
        max_messages: usize,
        router: Arc<ProviderRouter>,
        bridge: Arc<dyn MessagingGateway>,
    ) -> Result<Self, AkashaError> {
        let pattern = Regex::new(r"(?i)^akasha,\s*summarize\s+the\s+previous\s+(\d+)\s+messages?$")
            .map_err(|e| AkashaError::Config(format!("invalid summarize pattern: {e}")))?;
        Ok(Self {
            pattern,
            max_messages,
            router,
            bridge,
        })
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Parse the summarize command, returning the requested message
    /// count capped at the configured maximum.
    pub fn parse_trigger(&self, text: &str) -> Option<usize> {
        let captures = self.pattern.captures(text.trim())?;
        let count: usize = captures.get(1)?.as_str().parse().ok()?;
        Some(count.min(self.max_messages))
    }

    /// Fetch, summarize, and format the full response text.
    pub async fn summarize(&self, chat_jid: &str, count: usize) -> Result<String, AkashaError> {
        let messages = self.bridge.fetch_history(chat_jid, count).await?;

        if messages.is_empty() {
            return Ok("I couldn't find any messages to summarize in this chat.".to_string());
        }

        let (transcript, participants) = build_transcript(&messages);
        if transcript.is_empty() {
            return Ok("No text messages found to summarize.".to_string());
        }

        let request = GenerateRequest {
            prompt: summarize_prompt(&transcript),
            system: Some(SUMMARIZE_SYSTEM.to_string()),
            temperature: Some(SUMMARIZE_TEMPERATURE),
            max_tokens: None,
        };
        let summary = self.router.generate(&request).await?;

        info!(
            "summarized {} messages from {chat_jid} ({} participants)",
            messages.len(),
            participants.len()
        );

        let mut response = format!(
            "*Chat Summary* ({} messages)\n\n{}",
            messages.len(),
            summary.trim()
        );
        if !participants.is_empty() {
            let list: Vec<&str> = participants.iter().map(String::as_str).collect();
            response.push_str(&format!("\n\n*Participants:* {}", list.join(", ")));
        }
        Ok(response)
    }
}

/// Format history as `[sender]: text` lines, skipping empty messages.
/// Senders display as the phone portion of their JID.
fn build_transcript(messages: &[HistoryMessage]) -> (String, BTreeSet<String>) {
    let mut participants = BTreeSet::new();
    let mut lines = Vec::new();

    for msg in messages {
        if msg.content.is_empty() {
            continue;
        }
        let sender = if msg.sender_jid.is_empty() {
            "Unknown"
        } else {
            msg.sender_jid.split('@').next().unwrap_or("Unknown")
        };
        participants.insert(sender.to_string());
        lines.push(format!("[{sender}]: {}", msg.content));
    }

    (lines.join("\n"), participants)
}

fn summarize_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following chat conversation. Include who said what and the main topics discussed.\n\n\
         Chat messages:\n{transcript}\n\n\
         Requirements:\n\
         - Write the summary in the same language as the messages\n\
         - Mention key participants and their contributions\n\
         - Highlight main topics and any decisions or conclusions\n\
         - Keep it concise but comprehensive\n\
         - Format as a readable summary paragraph or bullet points"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use akasha_core::error::ProviderError;
    use akasha_core::message::{
        Completion, CompletionRequest, MediaPayload, OutboundDispatch, SendReceipt,
    };
    use akasha_core::traits::LlmProvider;
    use async_trait::async_trait;

    struct FixedProvider;

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn key_count(&self) -> usize {
            1
        }
        fn rotate_key(&self) {}
        async fn complete(&self, _r: &CompletionRequest) -> Result<Completion, ProviderError> {
            Ok(Completion::default())
        }
        async fn generate(&self, _r: &GenerateRequest) -> Result<String, ProviderError> {
            Ok("they discussed lunch plans".to_string())
        }
    }

    struct HistoryBridge {
        messages: Vec<HistoryMessage>,
    }

    #[async_trait]
    impl MessagingGateway for HistoryBridge {
        async fn send(&self, _d: &OutboundDispatch) -> Result<SendReceipt, AkashaError> {
            Err(AkashaError::Bridge("not under test".to_string()))
        }
        async fn download(&self, _m: &str, _p: &str) -> Result<MediaPayload, AkashaError> {
            Err(AkashaError::Bridge("not under test".to_string()))
        }
        async fn download_from_path(&self, _f: &str) -> Result<MediaPayload, AkashaError> {
            Err(AkashaError::Bridge("not under test".to_string()))
        }
        async fn fetch_history(
            &self,
            _chat_jid: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryMessage>, AkashaError> {
            Ok(self.messages.clone())
        }
        async fn check_health(&self) -> bool {
            true
        }
    }

    fn summarizer(messages: Vec<HistoryMessage>) -> ChatSummarizer {
        let router = Arc::new(ProviderRouter::new(
            Arc::new(FixedProvider),
            None,
            String::new(),
        ));
        ChatSummarizer::new(50, router, Arc::new(HistoryBridge { messages })).unwrap()
    }

    fn history(sender: &str, content: &str) -> HistoryMessage {
        HistoryMessage {
            sender_jid: sender.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_parse_trigger_matches_command() {
        let s = summarizer(vec![]);
        assert_eq!(s.parse_trigger("akasha, summarize the previous 20 messages"), Some(20));
        assert_eq!(s.parse_trigger("Akasha, summarize the previous 1 message"), Some(1));
        assert_eq!(
            s.parse_trigger("  AKASHA, summarize the previous 5 messages  "),
            Some(5)
        );
    }

    #[test]
    fn test_parse_trigger_caps_at_max() {
        let s = summarizer(vec![]);
        assert_eq!(s.parse_trigger("akasha, summarize the previous 500 messages"), Some(50));
    }

    #[test]
    fn test_parse_trigger_rejects_other_text() {
        let s = summarizer(vec![]);
        assert_eq!(s.parse_trigger("hey akasha, summarize things"), None);
        assert_eq!(s.parse_trigger("akasha, summarize the previous messages"), None);
        assert_eq!(s.parse_trigger("akasha, summarize the previous 5 messages please"), None);
    }

    #[test]
    fn test_build_transcript_formats_and_collects_participants() {
        let messages = vec![
            history("628111@s.whatsapp.net", "hello"),
            history("628222@s.whatsapp.net", "hi there"),
            history("628111@s.whatsapp.net", ""),
            history("", "anonymous note"),
        ];
        let (transcript, participants) = build_transcript(&messages);
        assert_eq!(
            transcript,
            "[628111]: hello\n[628222]: hi there\n[Unknown]: anonymous note"
        );
        assert_eq!(participants.len(), 3);
        assert!(participants.contains("628111"));
        assert!(participants.contains("Unknown"));
    }

    #[tokio::test]
    async fn test_summarize_empty_history() {
        let s = summarizer(vec![]);
        let text = s.summarize("group@g.us", 10).await.unwrap();
        assert!(text.contains("couldn't find any messages"));
    }

    #[tokio::test]
    async fn test_summarize_formats_response() {
        let s = summarizer(vec![
            history("628111@s.whatsapp.net", "lunch?"),
            history("628222@s.whatsapp.net", "yes, noon"),
        ]);
        let text = s.summarize("group@g.us", 10).await.unwrap();
        assert!(text.starts_with("*Chat Summary* (2 messages)"));
        assert!(text.contains("they discussed lunch plans"));
        assert!(text.contains("*Participants:* 628111, 628222"));
    }
}
