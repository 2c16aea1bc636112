//! Error types for the extraction core

use citescrape_domain::DomainError;
use thiserror::Error;

/// Errors that can occur while running the extraction pipeline
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid content spec, prompt, URL or template payload
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine text could not be coerced into the output schema
    #[error("Coercion failed: {0}")]
    Coercion(#[from] CoercionError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// Writing results failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<DomainError> for ExtractorError {
    fn from(e: DomainError) -> Self {
        ExtractorError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Json(e.to_string())
    }
}

impl From<std::io::Error> for ExtractorError {
    fn from(e: std::io::Error) -> Self {
        ExtractorError::Io(e.to_string())
    }
}

/// Why a raw engine answer does not fit the output schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The text is not JSON at all
    #[error("response is not valid JSON: {0}")]
    Syntax(String),

    /// The JSON does not match the schema
    #[error("at {path}: expected {expected}, found {found}")]
    Schema {
        /// Location of the offending value, e.g. `outputs[0].Film_Info-content[0].year`
        path: String,
        /// What the schema requires there
        expected: String,
        /// What the response held instead
        found: String,
    },
}

impl CoercionError {
    /// The JSON path of a schema mismatch
    pub fn path(&self) -> Option<&str> {
        match self {
            CoercionError::Syntax(_) => None,
            CoercionError::Schema { path, .. } => Some(path),
        }
    }
}
