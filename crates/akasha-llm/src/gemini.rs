//! Google Gemini provider with tool calling.
//!
//! Calls the `generateContent` endpoint. Auth via URL query param using
//! the rotator's current key; the router drives rotation between full
//! loop attempts.

use crate::classify::classify;
use crate::rotator::KeyRotator;
use crate::{web_search_parameters, TOOL_SEARCH_RESULTS, WEB_SEARCH_DESCRIPTION};
use akasha_core::{
    config::GeminiConfig,
    error::{AkashaError, ProviderError},
    message::{Completion, CompletionRequest, GenerateRequest, ImageInput},
    traits::{LlmProvider, SearchTool},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider.
pub struct GeminiProvider {
    rotator: KeyRotator,
    model: String,
    search: Arc<dyn SearchTool>,
    max_tool_calls: usize,
}

impl GeminiProvider {
    /// Create from config values.
    pub fn from_config(
        config: &GeminiConfig,
        search: Arc<dyn SearchTool>,
        max_tool_calls: usize,
    ) -> Result<Self, AkashaError> {
        Ok(Self {
            rotator: KeyRotator::new(config.api_keys.clone())?,
            model: config.model.clone(),
            search,
            max_tool_calls,
        })
    }

    fn web_search_tool() -> GeminiTool {
        GeminiTool {
            function_declarations: vec![GeminiFunctionDeclaration {
                name: "web_search".to_string(),
                description: WEB_SEARCH_DESCRIPTION.to_string(),
                parameters: web_search_parameters(),
            }],
        }
    }

    async fn generate_content(
        &self,
        contents: &[GeminiContent],
        system: Option<&str>,
        with_tools: bool,
        generation_config: Option<GenerationConfig>,
    ) -> Result<GeminiResponse, ProviderError> {
        let key = self.rotator.current();
        let client = self.rotator.client_for(&key);

        let body = GeminiRequest {
            contents: contents.to_vec(),
            system_instruction: system.map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(s)],
            }),
            tools: with_tools.then(|| vec![Self::web_search_tool()]),
            generation_config,
        };

        let url = format!(
            "{GEMINI_BASE_URL}/models/{}:generateContent?key={key}",
            self.model
        );
        debug!("gemini: POST models/{}:generateContent", self.model);

        let resp = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::fatal("gemini", format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError {
                provider: "gemini".to_string(),
                kind: classify(Some(status), &text),
                message: format!("gemini returned {status}: {text}"),
            });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::fatal("gemini", format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Clone)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn inline_image(image: &ImageInput) -> Self {
        Self {
            inline_data: Some(GeminiInlineData {
                mime_type: image.mime_type.clone(),
                data: BASE64.encode(&image.data),
            }),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Deserialize, Clone)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    /// First candidate's content, if the response carried one.
    fn into_content(self) -> Option<GeminiContent> {
        self.candidates?.into_iter().next()?.content
    }

    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> String {
        self.into_content()
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn key_count(&self) -> usize {
        self.rotator.len()
    }

    fn rotate_key(&self) {
        self.rotator.rotate();
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let mut sources: Vec<String> = Vec::new();

        // Image goes into the first request only; follow-up turns are text.
        let mut parts = Vec::new();
        if let Some(image) = &request.image {
            info!(
                "gemini: multimodal query with image ({})",
                image.mime_type
            );
            parts.push(GeminiPart::inline_image(image));
        }
        parts.push(GeminiPart::text(&request.prompt));

        let mut contents = vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }];

        for _ in 0..self.max_tool_calls {
            let resp = self
                .generate_content(&contents, request.system.as_deref(), true, None)
                .await?;
            let content = resp
                .into_content()
                .ok_or_else(|| ProviderError::fatal("gemini", "empty response"))?;

            let calls: Vec<GeminiFunctionCall> = content
                .parts
                .iter()
                .filter_map(|p| p.function_call.clone())
                .collect();

            if calls.is_empty() {
                let text = content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>();
                return Ok(Completion { text, sources });
            }

            contents.push(content);

            let mut responses = Vec::new();
            for call in calls {
                if call.name != "web_search" {
                    continue;
                }
                let query = call
                    .args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                info!("gemini tool call: web_search('{query}')");
                let results = self.search.search(&query, TOOL_SEARCH_RESULTS).await;
                for result in &results {
                    sources.push(result.link.clone());
                }

                responses.push(GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name: "web_search".to_string(),
                        response: serde_json::json!({ "results": results }),
                    }),
                    ..Default::default()
                });
            }

            contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: responses,
            });
        }

        // Budget spent: one final call with tools disabled.
        let resp = self
            .generate_content(&contents, request.system.as_deref(), false, None)
            .await?;
        Ok(Completion {
            text: resp.into_text(),
            sources,
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let contents = vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text(&request.prompt)],
        }];
        let config = GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        };
        let resp = self
            .generate_content(&contents, request.system.as_deref(), false, Some(config))
            .await?;
        Ok(resp.into_text())
    }
}
