//! citescrape LLM Provider Layer
//!
//! One capability interface, [`LlmProvider`], with a variant per backend.
//! The backend is chosen once at startup from [`ProviderKind`] by
//! [`build_provider`]; nothing else in the workspace branches on provider
//! names.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//! - `OpenAiProvider`: OpenAI chat completions, also used for DeepSeek and Azure OpenAI
//! - `AnthropicProvider`: Anthropic messages API
//! - `GeminiProvider`: Google Gemini `generateContent`
//!
//! # Examples
//!
//! ```
//! use citescrape_llm::{LlmProvider, MockProvider};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = rt.block_on(provider.generate("test prompt")).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod anthropic;
pub mod config;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use anthropic::AnthropicProvider;
pub use config::{build_provider, GenerationParams, LlmConfig, ProviderKind};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The provider needs an API key and none was configured
    #[error("Missing API key for provider '{provider}' (set {env_var} or llm.api_key)")]
    MissingApiKey {
        /// Provider name as written in configuration
        provider: &'static str,
        /// Environment variable consulted for the key
        env_var: &'static str,
    },

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Text generation capability
///
/// Implementations must be cheap to share behind an `Arc`; engines hold one
/// provider for the whole run.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generate a completion for a system instruction plus a user message
    ///
    /// Providers without a native system role get both parts joined into
    /// one prompt.
    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.generate(&format!("{}\n\n{}", system, user)).await
    }

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
enum Canned {
    Text(String),
    Error,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Lookup order: an exact per-prompt response, then the next queued
/// response, then the fixed default.
///
/// # Examples
///
/// ```
/// use citescrape_llm::{LlmProvider, MockProvider};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(rt.block_on(provider.generate("any prompt")).unwrap(), "Fixed response");
///
/// // Responses in order
/// let provider = MockProvider::default().with_sequence(["first", "second"]);
/// assert_eq!(rt.block_on(provider.generate("a")).unwrap(), "first");
/// assert_eq!(rt.block_on(provider.generate("b")).unwrap(), "second");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, Canned>>>,
    queue: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue responses returned one per call, before the default
    pub fn with_sequence<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.queue).extend(responses.into_iter().map(Into::into));
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), Canned::Text(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), Canned::Error);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Every prompt received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push(prompt.to_string());

        if let Some(canned) = lock(&self.responses).get(prompt) {
            return match canned {
                Canned::Text(response) => Ok(response.clone()),
                Canned::Error => Err(LlmError::Other("Mock error".to_string())),
            };
        }

        if let Some(next) = lock(&self.queue).pop_front() {
            return Ok(next);
        }

        Ok(self.default_response.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
