//! Hosted model adapter using the OpenRouter chat-completions API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::Generator;
use crate::error::{GeneratorError, WrapperError, WrapperResult};

/// OpenRouter API configuration.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API key for OpenRouter.
    pub api_key: String,
    /// Model to use, e.g. `openai/gpt-4o-mini`.
    pub model: String,
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Completion length limit.
    pub max_tokens: u32,
}

/// Request to OpenRouter API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from OpenRouter API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice; an absent or blank completion is an error.
    fn into_text(self) -> Result<String, GeneratorError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GeneratorError::EmptyResponse)
    }
}

/// Generator backed by a hosted chat model.
pub struct OpenRouterGenerator {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterGenerator {
    /// Create a new OpenRouter generator.
    pub fn new(config: OpenRouterConfig) -> WrapperResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WrapperError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Request a completion for `prompt`.
    pub async fn complete(&self, prompt: &str) -> Result<String, GeneratorError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(self.config.max_tokens),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Wrapper Core")
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Request(format!("Failed to parse response: {}", e)))?;

        chat_response.into_text()
    }
}

impl Generator for OpenRouterGenerator {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    /// Blocks the calling thread until the completion arrives.
    ///
    /// Call from a blocking-pool thread (`spawn_blocking`) of a tokio
    /// runtime, never from an async task.
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending prompt to OpenRouter"
        );

        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            GeneratorError::Unavailable("no tokio runtime for the HTTP client".to_string())
        })?;

        handle.block_on(self.complete(prompt))
    }
}
