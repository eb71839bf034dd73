//! User-facing error messages, picked by inspecting the error text.

/// Apology for a failed text exchange.
pub fn apology_for(error: &str) -> &'static str {
    let lower = error.to_lowercase();

    if error.contains("503") || lower.contains("unavailable") || lower.contains("overload") {
        "The AI service is temporarily overloaded. I tried all available API keys \
         but couldn't connect. Please try again in a moment."
    } else if error.contains("429") || lower.contains("quota") || lower.contains("rate") {
        "I'm currently experiencing high demand and hit my rate limit. \
         Please wait a moment and try again."
    } else if lower.contains("exhausted") || lower.contains("all api keys") {
        "All my API resources are temporarily exhausted. Please try again in a few minutes."
    } else if lower.contains("timeout") {
        "The request took too long to process. Please try again with a simpler question."
    } else if lower.contains("api") && lower.contains("key") {
        "I'm having trouble connecting to my AI service. Please notify the administrator."
    } else {
        "Sorry, I encountered an error processing your request. Please try again."
    }
}

/// Apology for a failed image exchange. Download failures get their own
/// message; the rest mirrors the text categories.
pub fn image_apology_for(error: &str) -> &'static str {
    let lower = error.to_lowercase();

    if lower.contains("download") || lower.contains("media") {
        "I couldn't download the image. Please try sending it again."
    } else if error.contains("503") || lower.contains("unavailable") || lower.contains("overload") {
        "The AI service is temporarily overloaded. I tried all available API keys \
         but couldn't connect. Please try again in a moment."
    } else if error.contains("429") || lower.contains("quota") || lower.contains("rate") {
        "I'm currently experiencing high demand. Please wait a moment and try again."
    } else if lower.contains("exhausted") || lower.contains("all api keys") {
        "All my API resources are temporarily exhausted. Please try again in a few minutes."
    } else {
        "Sorry, I couldn't process the image. Please try again."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_category() {
        assert!(apology_for("gemini returned 503: overloaded").contains("temporarily overloaded"));
        assert!(apology_for("service UNAVAILABLE").contains("temporarily overloaded"));
    }

    #[test]
    fn test_quota_category() {
        assert!(apology_for("429 Too Many Requests").contains("rate limit"));
        assert!(apology_for("quota exceeded for project").contains("rate limit"));
    }

    #[test]
    fn test_exhausted_category() {
        assert!(apology_for("all API keys exhausted").contains("temporarily exhausted"));
    }

    #[test]
    fn test_timeout_category() {
        assert!(apology_for("request timeout after 45s").contains("took too long"));
    }

    #[test]
    fn test_bad_key_category() {
        assert!(apology_for("API key expired").contains("notify the administrator"));
    }

    #[test]
    fn test_generic_fallback() {
        assert!(apology_for("something odd").contains("encountered an error"));
    }

    #[test]
    fn test_image_download_category() {
        assert!(image_apology_for("could not fetch media for message X")
            .contains("couldn't download the image"));
        assert!(image_apology_for("download failed").contains("couldn't download the image"));
    }

    #[test]
    fn test_image_generic_fallback() {
        assert!(image_apology_for("something odd").contains("couldn't process the image"));
    }
}
