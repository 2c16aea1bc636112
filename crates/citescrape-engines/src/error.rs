//! Error types for the engine adapters

use citescrape_llm::LlmError;
use thiserror::Error;

/// Failures inside an engine
///
/// These never cross the engine contract: adapters log them and report that
/// nothing was produced.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The LLM call failed
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// An HTTP request failed or returned an error status
    #[error("HTTP error: {0}")]
    Http(String),

    /// The browser driver could not perform an action
    #[error("Browser error: {0}")]
    Driver(String),

    /// A document could not be loaded
    #[error("Document error: {0}")]
    Document(String),

    /// Missing or unusable settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Http(err.to_string())
    }
}
