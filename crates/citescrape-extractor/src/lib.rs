//! citescrape Extractor
//!
//! The result-coercion and dynamic-schema core. Every extraction engine
//! returns free-form text; this crate turns it into a typed, validated
//! result with the same envelope regardless of which engine produced it.
//!
//! # Architecture
//!
//! ```text
//! ContentFieldSpec → ContentModel → OutputModelList ─┐
//! template + prompt → Task → ExtractionEngine → raw text → coerce → assemble → output.json
//! ```
//!
//! # Key Features
//!
//! - **Runtime schemas**: record types built from configuration, no codegen
//! - **Two-stage coercion**: validate the full document, else wrap a bare
//!   object and retry; the first error is the one reported
//! - **Template catalog**: named instruction blueprints, structured tabular
//!   prompts turned into prose
//! - **Uniform envelope**: one result shape for all engines, plus the fixed
//!   empty shape when an engine finds nothing
//!
//! # Example Usage
//!
//! ```
//! use citescrape_domain::ContentFieldSpec;
//! use citescrape_extractor::{build_output_model, coerce};
//!
//! let spec = ContentFieldSpec::new("Film_Info", vec![("title", "str"), ("year", "int")]).unwrap();
//! let schema = build_output_model(&spec);
//!
//! let parsed = coerce(r#"{"title": "Inception", "year": 2010}"#, &schema).unwrap();
//! assert_eq!(parsed.outputs().len(), 1);
//! ```

#![warn(missing_docs)]

mod coercer;
mod engine;
mod envelope;
mod error;
mod output_model;
mod pipeline;
mod schema;
mod templates;

#[cfg(test)]
mod tests;

pub use coercer::{coerce, strip_code_fences};
pub use engine::{ExtractionEngine, InitialAction, RunContext, ScrollDirection};
pub use envelope::{assemble, ResultEnvelope, OUTPUT_FILE_NAME};
pub use error::{CoercionError, ExtractorError};
pub use output_model::{
    build_output_model, OutputList, OutputModelList, OutputRecord, DEFAULT_FORMAT_TYPE,
};
pub use pipeline::{Pipeline, PipelineOutcome, RunRequest};
pub use schema::{build_content_model, ContentModel, ContentRecord, FieldValue, CITATIONS_FIELD};
pub use templates::{
    find_template, prompt_text, render_task, resolve_template, template_names, PayloadKind,
    ResolvedTemplate, TaskTemplate, DEFAULT_TEMPLATE, PDF_DEFAULT_TEMPLATE, TABULAR_TEMPLATE,
    TEMPLATES,
};
