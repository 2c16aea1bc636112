//! Anthropic messages API provider

use crate::http::{self, RetryPolicy};
use crate::{GenerationParams, LlmError, LlmProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value of the `anthropic-version` header
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// A provider for the Anthropic messages API
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl AnthropicProvider {
    /// Create a provider for `<base_url>/messages`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Self::with_timeout(
            base_url,
            api_key,
            model,
            Duration::from_secs(http::DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a provider with an explicit request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        Ok(Self {
            client: http::build_client(timeout)?,
            url: format!("{}/messages", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set sampling parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    async fn send(&self, system: Option<&str>, user: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            system,
            messages: [UserMessage {
                role: "user",
                content: user,
            }],
        };

        let response: MessagesResponse = http::send_json(self.retry, &self.model, || {
            self.client
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Response contained no text blocks".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.send(None, prompt).await
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.send(Some(system), user).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
