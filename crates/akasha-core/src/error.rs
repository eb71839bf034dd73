use thiserror::Error;

/// Top-level error type for Akasha.
#[derive(Debug, Error)]
pub enum AkashaError {
    /// Error from an LLM provider, carrying its retry classification.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Error talking to the WhatsApp bridge.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Media could not be obtained by any resolution strategy.
    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a provider failure should be handled upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Quota, rate limit, or transient overload: worth trying the next
    /// key or the fallback provider.
    Rotatable,
    /// Anything a retry with different credentials cannot fix.
    Fatal,
}

/// A failure reported by an LLM provider call.
#[derive(Debug, Clone, Error)]
#[error("{provider} error: {message}")]
pub struct ProviderError {
    /// Provider name (e.g. "gemini", "openai").
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn rotatable(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Rotatable,
            message: message.into(),
        }
    }

    pub fn fatal(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_rotatable(&self) -> bool {
        self.kind == ProviderErrorKind::Rotatable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let e = ProviderError::rotatable("gemini", "quota exceeded");
        assert_eq!(e.to_string(), "gemini error: quota exceeded");
        assert!(e.is_rotatable());
    }

    #[test]
    fn test_provider_error_wraps_into_akasha_error() {
        let e: AkashaError = ProviderError::fatal("openai", "bad request").into();
        assert_eq!(e.to_string(), "openai error: bad request");
    }
}
