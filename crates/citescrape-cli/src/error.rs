//! Error types for the CLI application.

use citescrape_domain::DomainError;
use citescrape_engines::EngineError;
use citescrape_extractor::ExtractorError;
use citescrape_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration or profile error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid content declaration or prompt
    #[error("Configuration error: {0}")]
    Domain(#[from] DomainError),

    /// Pipeline error
    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    /// Engine construction error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The run was interrupted before it finished
    #[error("Run cancelled")]
    Cancelled,
}
