//! citescrape Domain Layer
//!
//! Core vocabulary shared by every other crate in the workspace. Like any
//! domain layer it has no external dependencies: it describes *what* a run
//! extracts and *how it is asked for*, never how pages are fetched or how
//! LLM answers are validated.
//!
//! ## Key Concepts
//!
//! - **Content spec**: the declared shape of one extracted record
//!   (field name to primitive type), see [`ContentFieldSpec`]
//! - **Task**: the rendered instruction sent to an extraction engine
//! - **Task prompt**: the payload a template is rendered with, either plain
//!   text or a structured tabular request
//! - **Citation**: where on the source a value was found

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod citation;
pub mod content_spec;
pub mod error;
pub mod field;
pub mod task;

// Re-exports for convenience
pub use citation::Citation;
pub use content_spec::{ContentFieldSpec, FieldDef, DEFAULT_MODEL_NAME, RESERVED_FIELD_NAMES};
pub use error::DomainError;
pub use field::FieldType;
pub use task::{PageLimit, TabularPrompt, Task, TaskPrompt};
