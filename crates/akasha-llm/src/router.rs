//! Provider routing with key rotation and fallback.
//!
//! Policy: try the primary provider, retrying the whole tool loop once
//! per configured key on rotatable errors. When the primary is
//! exhausted and a fallback is configured, the fallback gets the same
//! full rotation exactly once. Fatal errors propagate immediately; once
//! both providers are exhausted the last observed error propagates.

use akasha_core::{
    error::ProviderError,
    message::{Completion, CompletionRequest, GenerateRequest, ImageInput},
    traits::LlmProvider,
};
use std::sync::Arc;
use tracing::warn;

/// Routes completion requests across the configured providers.
pub struct ProviderRouter {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<Arc<dyn LlmProvider>>,
    system_instruction: String,
}

impl ProviderRouter {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback: Option<Arc<dyn LlmProvider>>,
        system_instruction: String,
    ) -> Self {
        Self {
            primary,
            fallback,
            system_instruction,
        }
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback.as_deref().map(|p| p.name())
    }

    /// Frame the quoted message the user replied to, if any.
    fn compose_prompt(query: &str, quoted_context: Option<&str>) -> String {
        match quoted_context {
            Some(ctx) => format!(
                "The user is replying to this message:\n---\n{ctx}\n---\n\nUser's question/comment: {query}"
            ),
            None => query.to_string(),
        }
    }

    /// Run the tool-calling loop with rotation and fallback.
    pub async fn process(
        &self,
        query: &str,
        quoted_context: Option<&str>,
        image: Option<ImageInput>,
    ) -> Result<Completion, ProviderError> {
        let request = CompletionRequest {
            prompt: Self::compose_prompt(query, quoted_context),
            system: Some(self.system_instruction.clone()),
            image,
        };

        match self.complete_with_rotation(&*self.primary, &request).await {
            Ok(completion) => Ok(completion),
            Err(e) if e.is_rotatable() => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        "primary provider '{}' exhausted ({e}), falling back to '{}'",
                        self.primary.name(),
                        fallback.name()
                    );
                    self.complete_with_rotation(&**fallback, &request).await
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Plain no-tools generation with the same rotation/fallback policy.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        match self.generate_with_rotation(&*self.primary, request).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_rotatable() => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        "primary provider '{}' exhausted ({e}), falling back to '{}'",
                        self.primary.name(),
                        fallback.name()
                    );
                    self.generate_with_rotation(&**fallback, request).await
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// One attempt per configured key. Each retry restarts the tool
    /// loop from scratch; a fatal error aborts the rotation.
    async fn complete_with_rotation(
        &self,
        provider: &dyn LlmProvider,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let attempts = provider.key_count().max(1);
        let mut last: Option<ProviderError> = None;

        for attempt in 0..attempts {
            match provider.complete(request).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_rotatable() => {
                    warn!(
                        "{}: key {}/{attempts} failed ({}), rotating",
                        provider.name(),
                        attempt + 1,
                        e.message
                    );
                    provider.rotate_key();
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last
            .unwrap_or_else(|| ProviderError::rotatable(provider.name(), "all API keys exhausted")))
    }

    async fn generate_with_rotation(
        &self,
        provider: &dyn LlmProvider,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError> {
        let attempts = provider.key_count().max(1);
        let mut last: Option<ProviderError> = None;

        for attempt in 0..attempts {
            match provider.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rotatable() => {
                    warn!(
                        "{}: key {}/{attempts} failed ({}), rotating",
                        provider.name(),
                        attempt + 1,
                        e.message
                    );
                    provider.rotate_key();
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last
            .unwrap_or_else(|| ProviderError::rotatable(provider.name(), "all API keys exhausted")))
    }
}
