//! Provider selection and generation settings

use crate::{
    AnthropicProvider, GeminiProvider, LlmError, LlmProvider, MockProvider, OllamaProvider,
    OpenAiProvider,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Azure OpenAI REST API version used when none is configured
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,

    /// Azure-hosted OpenAI deployment
    #[serde(rename = "azure_openai")]
    AzureOpenAi,

    /// DeepSeek (OpenAI-compatible)
    #[serde(rename = "deepseek")]
    DeepSeek,

    /// Anthropic messages API
    #[serde(rename = "anthropic")]
    Anthropic,

    /// Google Gemini
    #[serde(rename = "google")]
    Google,

    /// Local Ollama server
    #[serde(rename = "ollama")]
    Ollama,

    /// Canned responses, no network
    #[serde(rename = "mock")]
    Mock,
}

impl ProviderKind {
    /// Every provider, in the order they are documented
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::OpenAi,
        ProviderKind::AzureOpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Ollama,
        ProviderKind::Mock,
    ];

    /// Configuration name of the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::AzureOpenAi => "azure_openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Mock => "mock",
        }
    }

    /// Environment variable holding the API key, for providers that need one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::AzureOpenAi => Some("AZURE_OPENAI_API_KEY"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Google => Some("GOOGLE_API_KEY"),
            ProviderKind::Ollama | ProviderKind::Mock => None,
        }
    }

    /// Base URL used when `llm.endpoint` is not set
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            ProviderKind::DeepSeek => Some("https://api.deepseek.com/v1"),
            ProviderKind::Anthropic => Some("https://api.anthropic.com/v1"),
            ProviderKind::Google => Some("https://generativelanguage.googleapis.com/v1beta"),
            ProviderKind::Ollama => Some(crate::ollama::DEFAULT_ENDPOINT),
            ProviderKind::AzureOpenAi | ProviderKind::Mock => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                LlmError::Other(format!(
                    "Unsupported provider: {}. Supported providers are: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Sampling parameters passed with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the completion
    pub max_tokens: u32,
    /// Nucleus sampling mass
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 1.0,
        }
    }
}

/// The `[llm]` configuration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which backend to talk to
    pub provider: ProviderKind,

    /// Model (or Azure deployment) name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens in the completion
    pub max_tokens: u32,

    /// Nucleus sampling mass
    pub top_p: f32,

    /// Base URL overriding the provider default (required for Azure)
    pub endpoint: Option<String>,

    /// API key; the provider's environment variable wins when both are set
    pub api_key: Option<String>,

    /// Azure OpenAI API version
    pub api_version: Option<String>,

    /// Attempts per request
    pub max_retries: u32,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            endpoint: None,
            api_key: None,
            api_version: None,
            max_retries: crate::http::DEFAULT_MAX_RETRIES,
            timeout_secs: crate::http::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Sampling parameters from this config
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }

    /// Resolve the API key, preferring the environment over the file
    ///
    /// `env` looks up an environment variable by name.
    pub fn resolve_api_key<F>(&self, env: F) -> Result<Option<String>, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(var) = self.provider.api_key_env() else {
            return Ok(None);
        };

        env(var)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
            .map(Some)
            .ok_or(LlmError::MissingApiKey {
                provider: self.provider.as_str(),
                env_var: var,
            })
    }

    /// Endpoint to use, falling back to the provider default
    pub fn resolve_endpoint(&self) -> Result<String, LlmError> {
        self.endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.provider.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                LlmError::Other(format!(
                    "Provider '{}' requires llm.endpoint to be set",
                    self.provider
                ))
            })
    }

    /// Check the configuration without building a client
    pub fn validate<F>(&self, env: F) -> Result<(), LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.model.trim().is_empty() {
            return Err(LlmError::Other("llm.model must be specified".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::Other(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.provider != ProviderKind::Mock {
            self.resolve_endpoint()?;
        }
        self.resolve_api_key(env)?;
        Ok(())
    }
}

/// Build the provider selected by `config`, reading keys from the process environment
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    build_provider_with_env(config, |var| std::env::var(var).ok())
}

/// Build the provider selected by `config` with an explicit environment lookup
pub fn build_provider_with_env<F>(
    config: &LlmConfig,
    env: F,
) -> Result<Arc<dyn LlmProvider>, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    config.validate(&env)?;

    let params = config.params();
    let timeout = Duration::from_secs(config.timeout_secs);
    let api_key = config.resolve_api_key(&env)?.unwrap_or_default();

    info!(provider = %config.provider, model = %config.model, "Initialising LLM provider");

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Mock => Arc::new(MockProvider::default()),
        ProviderKind::Ollama => Arc::new(
            OllamaProvider::with_timeout(config.resolve_endpoint()?, &config.model, timeout)?
                .with_params(params)
                .with_max_retries(config.max_retries),
        ),
        ProviderKind::OpenAi | ProviderKind::DeepSeek => Arc::new(
            OpenAiProvider::with_timeout(
                config.resolve_endpoint()?,
                api_key,
                &config.model,
                timeout,
            )?
            .with_params(params)
            .with_max_retries(config.max_retries),
        ),
        ProviderKind::AzureOpenAi => Arc::new(
            OpenAiProvider::azure(
                config.resolve_endpoint()?,
                api_key,
                &config.model,
                config
                    .api_version
                    .as_deref()
                    .unwrap_or(DEFAULT_AZURE_API_VERSION),
                timeout,
            )?
            .with_params(params)
            .with_max_retries(config.max_retries),
        ),
        ProviderKind::Anthropic => Arc::new(
            AnthropicProvider::with_timeout(
                config.resolve_endpoint()?,
                api_key,
                &config.model,
                timeout,
            )?
            .with_params(params)
            .with_max_retries(config.max_retries),
        ),
        ProviderKind::Google => Arc::new(
            GeminiProvider::with_timeout(
                config.resolve_endpoint()?,
                api_key,
                &config.model,
                timeout,
            )?
            .with_params(params)
            .with_max_retries(config.max_retries),
        ),
    };

    Ok(provider)
}
