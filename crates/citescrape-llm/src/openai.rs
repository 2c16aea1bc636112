//! OpenAI-compatible chat completions
//!
//! Serves OpenAI itself, DeepSeek (same wire format, different base URL) and
//! Azure OpenAI (deployment URL plus `api-key` header).

use crate::http::{self, RetryPolicy};
use crate::{GenerationParams, LlmError, LlmProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    AzureKey(String),
}

/// Provider for OpenAI-style `chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
    send_model: bool,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    /// Create a provider for `<base_url>/chat/completions`
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
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.into()),
            model: model.into(),
            send_model: true,
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Create a provider for an Azure OpenAI deployment
    ///
    /// `deployment` names the Azure deployment; it is addressed by URL and not
    /// sent in the body.
    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.into();
        let deployment = deployment.into();
        Ok(Self {
            client: http::build_client(timeout)?,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            auth: Auth::AzureKey(api_key.into()),
            model: deployment,
            send_model: false,
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

    /// Set the delay before the first retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    async fn complete(&self, messages: Vec<ChatMessage<'_>>) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: self.send_model.then_some(self.model.as_str()),
            messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            top_p: self.params.top_p,
            stream: false,
        };

        debug!(model = %self.model, url = %self.url, "Chat completion request");
        let response: ChatResponse = http::send_json(self.retry, &self.model, || {
            let request = self.client.post(&self.url).json(&body);
            match &self.auth {
                Auth::Bearer(key) => request.bearer_auth(key),
                Auth::AzureKey(key) => request.header("api-key", key),
            }
        })
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no choices".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(vec![ChatMessage {
            role: "user",
            content: prompt,
        }])
        .await
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.complete(vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
