//! Domain-level validation errors

use std::fmt;

/// Errors raised while building domain values from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field declared a type tag outside the recognised primitives
    UnknownFieldType {
        /// Field that carried the tag
        field: String,
        /// The tag as written in configuration
        tag: String,
    },

    /// A field name collides with a key of the output envelope
    ReservedFieldName(String),

    /// The same field was declared twice
    DuplicateField(String),

    /// A field or model name is empty
    EmptyName,

    /// The content declaration is malformed (wrong arity, no fields, ...)
    InvalidDeclaration(String),

    /// A structured prompt is missing a required key
    MissingPromptKey(&'static str),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::UnknownFieldType { field, tag } => write!(
                f,
                "field '{}' has unknown type '{}' (expected one of: str, int, float, bool)",
                field, tag
            ),
            DomainError::ReservedFieldName(name) => {
                write!(f, "field name '{}' is reserved by the output envelope", name)
            }
            DomainError::DuplicateField(name) => write!(f, "field '{}' is declared twice", name),
            DomainError::EmptyName => write!(f, "names must not be empty"),
            DomainError::InvalidDeclaration(msg) => write!(f, "invalid content declaration: {}", msg),
            DomainError::MissingPromptKey(key) => {
                write!(f, "structured prompt is missing required key '{}'", key)
            }
        }
    }
}

impl std::error::Error for DomainError {}
