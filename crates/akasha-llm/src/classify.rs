//! Provider error classification.
//!
//! HTTP status codes decide first; message substrings are the fallback
//! for vendors that bury the real condition in the body.

use akasha_core::error::ProviderErrorKind;

/// Body substrings that mark an error as worth rotating on.
const ROTATABLE_MARKERS: &[&str] = &[
    // Rate limit / quota
    "429",
    "quota",
    "rate",
    "exhausted",
    "all api keys",
    // Invalid or expired key
    "api_key_invalid",
    "api key expired",
    "invalid_argument",
    "invalid api key",
    // Server overload / unavailable
    "503",
    "500",
    "unavailable",
    "overload",
    "internal error",
];

/// Classify a provider failure from HTTP status and response body.
pub fn classify(status: Option<u16>, message: &str) -> ProviderErrorKind {
    if let Some(code) = status {
        if matches!(code, 429 | 500 | 503) {
            return ProviderErrorKind::Rotatable;
        }
    }

    let lower = message.to_lowercase();
    if ROTATABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        ProviderErrorKind::Rotatable
    } else {
        ProviderErrorKind::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_rotate() {
        assert_eq!(classify(Some(429), ""), ProviderErrorKind::Rotatable);
        assert_eq!(classify(Some(500), ""), ProviderErrorKind::Rotatable);
        assert_eq!(classify(Some(503), ""), ProviderErrorKind::Rotatable);
    }

    #[test]
    fn test_quota_substrings_rotate() {
        assert_eq!(
            classify(Some(400), "RESOURCE_EXHAUSTED: quota exceeded"),
            ProviderErrorKind::Rotatable
        );
        assert_eq!(
            classify(None, "Rate limit reached"),
            ProviderErrorKind::Rotatable
        );
    }

    #[test]
    fn test_invalid_key_rotates() {
        assert_eq!(
            classify(Some(400), "API_KEY_INVALID: the provided key is bad"),
            ProviderErrorKind::Rotatable
        );
        assert_eq!(
            classify(Some(403), "API key expired"),
            ProviderErrorKind::Rotatable
        );
    }

    #[test]
    fn test_overload_rotates() {
        assert_eq!(
            classify(None, "the model is overloaded, try later"),
            ProviderErrorKind::Rotatable
        );
        assert_eq!(
            classify(None, "service temporarily unavailable"),
            ProviderErrorKind::Rotatable
        );
    }

    #[test]
    fn test_other_errors_are_fatal() {
        assert_eq!(
            classify(Some(400), "request body is malformed"),
            ProviderErrorKind::Fatal
        );
        assert_eq!(classify(None, "unsupported image type"), ProviderErrorKind::Fatal);
    }
}
