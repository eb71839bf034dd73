//! Trigger phrase matching for the reply agent.

/// Decides whether an inbound text addresses the assistant.
///
/// The trigger is a case-insensitive prefix match; the query is
/// whatever follows the phrase.
pub struct ReplyDecisionEngine {
    phrase: String,
}

impl ReplyDecisionEngine {
    pub fn new(trigger_phrase: &str) -> Self {
        Self {
            phrase: trigger_phrase.to_lowercase(),
        }
    }

    pub fn trigger_phrase(&self) -> &str {
        &self.phrase
    }

    /// True when the message starts with the trigger phrase,
    /// ignoring case.
    pub fn should_trigger(&self, text: &str) -> bool {
        text.get(..self.phrase.len())
            .is_some_and(|head| head.to_lowercase() == self.phrase)
    }

    /// Strip the trigger phrase and surrounding whitespace.
    /// Callers check `should_trigger` first; without a match the
    /// original text comes back trimmed.
    pub fn extract_query(&self, text: &str) -> String {
        if self.should_trigger(text) {
            text.get(self.phrase.len()..).unwrap_or("").trim().to_string()
        } else {
            text.trim().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ReplyDecisionEngine {
        ReplyDecisionEngine::new("hey akasha,")
    }

    #[test]
    fn test_trigger_matches_prefix_case_insensitively() {
        let e = engine();
        assert!(e.should_trigger("hey akasha, what's the weather?"));
        assert!(e.should_trigger("Hey Akasha, hello"));
        assert!(e.should_trigger("HEY AKASHA, hello"));
    }

    #[test]
    fn test_trigger_requires_prefix_position() {
        let e = engine();
        assert!(!e.should_trigger("well hey akasha, hello"));
        assert!(!e.should_trigger("hey akasha hello"));
        assert!(!e.should_trigger(""));
        assert!(!e.should_trigger("hey"));
    }

    #[test]
    fn test_extract_query_strips_phrase_and_whitespace() {
        let e = engine();
        assert_eq!(
            e.extract_query("hey akasha,   what's the weather?"),
            "what's the weather?"
        );
        assert_eq!(e.extract_query("Hey Akasha, hello"), "hello");
        assert_eq!(e.extract_query("hey akasha,"), "");
    }

    #[test]
    fn test_extract_query_without_trigger_returns_trimmed_text() {
        let e = engine();
        assert_eq!(e.extract_query("  plain message  "), "plain message");
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let e = engine();
        assert!(!e.should_trigger("héllo wörld"));
        assert_eq!(e.extract_query("你好"), "你好");
    }
}
