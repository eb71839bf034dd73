//! OpenAI chat completions provider with function calling.
//!
//! Bearer auth with the rotator's current key. Images travel as base64
//! data URLs in a multimodal content array.

use crate::classify::classify;
use crate::rotator::KeyRotator;
use crate::{web_search_parameters, TOOL_SEARCH_RESULTS, WEB_SEARCH_DESCRIPTION};
use akasha_core::{
    config::OpenAiConfig,
    error::{AkashaError, ProviderError},
    message::{Completion, CompletionRequest, GenerateRequest, ImageInput},
    traits::{LlmProvider, SearchTool},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// OpenAI chat completions provider.
pub struct OpenAiProvider {
    rotator: KeyRotator,
    model: String,
    base_url: String,
    search: Arc<dyn SearchTool>,
    max_tool_calls: usize,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(
        config: &OpenAiConfig,
        search: Arc<dyn SearchTool>,
        max_tool_calls: usize,
    ) -> Result<Self, AkashaError> {
        Ok(Self {
            rotator: KeyRotator::new(config.api_keys.clone())?,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search,
            max_tool_calls,
        })
    }

    fn web_search_tool() -> ToolSpec {
        ToolSpec {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: "web_search".to_string(),
                description: WEB_SEARCH_DESCRIPTION.to_string(),
                parameters: web_search_parameters(),
            },
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        with_tools: bool,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<ChatMessage, ProviderError> {
        let key = self.rotator.current();
        let client = self.rotator.client_for(&key);

        let body = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: with_tools.then(|| vec![Self::web_search_tool()]),
            tool_choice: with_tools.then(|| "auto".to_string()),
            temperature,
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("openai: POST chat/completions model={}", self.model);

        let resp = client
            .post(&url)
            .bearer_auth(&key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::fatal("openai", format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError {
                provider: "openai".to_string(),
                kind: classify(Some(status), &text),
                message: format!("openai returned {status}: {text}"),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::fatal("openai", format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::fatal("openai", "empty response"))
    }

    fn user_message(prompt: &str, image: Option<&ImageInput>) -> ChatMessage {
        let content = match image {
            Some(image) => {
                info!("openai: multimodal query with image ({})", image.mime_type);
                let url = format!(
                    "data:{};base64,{}",
                    image.mime_type,
                    BASE64.encode(&image.data)
                );
                MessageContent::Parts(vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url },
                    },
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                ])
            }
            None => MessageContent::Text(prompt.to_string()),
        };
        ChatMessage {
            role: "user".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }
}

/// Chat content: a plain string, or parts for multimodal messages.
#[derive(Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Clone)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize, Deserialize, Clone)]
struct ToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionRef,
}

#[derive(Serialize, Deserialize, Clone)]
struct FunctionRef {
    name: String,
    /// JSON-encoded arguments string, as the API delivers them.
    arguments: String,
}

#[derive(Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: String,
    function: FunctionSpec,
}

#[derive(Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn key_count(&self) -> usize {
        self.rotator.len()
    }

    fn rotate_key(&self) {
        self.rotator.rotate();
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let mut sources: Vec<String> = Vec::new();
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(MessageContent::Text(system.clone())),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.push(Self::user_message(&request.prompt, request.image.as_ref()));

        for _ in 0..self.max_tool_calls {
            let assistant = self.chat(&messages, true, None, None).await?;

            let Some(tool_calls) = assistant.tool_calls.clone().filter(|c| !c.is_empty()) else {
                return Ok(Completion {
                    text: assistant.text(),
                    sources,
                });
            };

            messages.push(assistant);

            for call in tool_calls {
                if call.function.name != "web_search" {
                    continue;
                }
                let args: serde_json::Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or_default();
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                info!("openai tool call: web_search('{query}')");
                let results = self.search.search(&query, TOOL_SEARCH_RESULTS).await;
                for result in &results {
                    sources.push(result.link.clone());
                }

                let payload =
                    serde_json::to_string(&results).unwrap_or_else(|_| "[]".to_string());
                messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: Some(MessageContent::Text(payload)),
                    tool_calls: None,
                    tool_call_id: Some(call.id),
                });
            }
        }

        // Budget spent: one final call with tools disabled.
        let assistant = self.chat(&messages, false, None, None).await?;
        Ok(Completion {
            text: assistant.text(),
            sources,
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(MessageContent::Text(system.clone())),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.push(Self::user_message(&request.prompt, None));

        let assistant = self
            .chat(&messages, false, request.temperature, request.max_tokens)
            .await?;
        Ok(assistant.text())
    }
}
