//! The sequential extraction pipeline
//!
//! ```text
//! spec → output model → task → engine → coerce → envelope → output.json
//! ```

use crate::coercer::coerce;
use crate::engine::{ExtractionEngine, RunContext};
use crate::envelope::{assemble, ResultEnvelope};
use crate::error::ExtractorError;
use crate::output_model::{build_output_model, OutputList, OutputModelList};
use crate::templates::{find_template, prompt_text, render_task, DEFAULT_TEMPLATE};
use citescrape_domain::{ContentFieldSpec, Task, TaskPrompt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to extract: the content spec, template and prompt of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Shape of one extracted record
    pub content: ContentFieldSpec,
    /// Template name; unknown names fall back to `default`
    pub template_name: String,
    /// Prompt the template is rendered with
    pub prompt: TaskPrompt,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The rendered task
    pub task: Task,
    /// Coerced result, `None` when the engine produced nothing
    pub parsed: Option<OutputList>,
    /// Final envelope
    pub envelope: ResultEnvelope,
    /// Where the envelope was written, if anywhere
    pub output_path: Option<PathBuf>,
}

/// Runs one request against one engine
pub struct Pipeline {
    engine: Arc<dyn ExtractionEngine>,
}

impl Pipeline {
    /// Create a pipeline around an engine
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self { engine }
    }

    /// The engine this pipeline drives
    pub fn engine(&self) -> &Arc<dyn ExtractionEngine> {
        &self.engine
    }

    /// Build the output schema a request will be validated against
    ///
    /// Templates that request citations extend every record with them.
    pub fn schema_for(request: &RunRequest) -> Result<OutputModelList, ExtractorError> {
        let schema = build_output_model(&request.content);
        let cites = find_template(&request.template_name)
            .or_else(|| find_template(DEFAULT_TEMPLATE))
            .is_some_and(|t| t.requests_citations);
        if cites {
            schema.with_citations()
        } else {
            Ok(schema)
        }
    }

    /// Run the request
    ///
    /// Configuration and coercion errors abort the run before anything is
    /// written. An engine that produces no text yields the empty envelope.
    pub async fn run(
        &self,
        request: &RunRequest,
        ctx: &RunContext,
    ) -> Result<PipelineOutcome, ExtractorError> {
        if request.prompt.is_empty() {
            return Err(ExtractorError::Config("prompt must not be empty".to_string()));
        }

        let schema = Self::schema_for(request)?;
        let task = render_task(&request.template_name, &request.prompt)?;
        debug!(template = task.template_name(), task_len = task.text().len(), "Task rendered");

        info!(
            engine = self.engine.name(),
            model = schema.content_model().name(),
            "Starting extraction"
        );
        let prompt = prompt_text(&request.prompt);
        let engine_ctx = ctx.clone().with_prompt(prompt.clone());
        let started = Instant::now();
        let raw = self.engine.run(&task, &schema, &engine_ctx).await;
        info!(
            engine = self.engine.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            produced = raw.is_some(),
            "Engine finished"
        );

        let parsed = match raw.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(coerce(text, &schema)?),
            _ => {
                warn!(engine = self.engine.name(), "Engine produced no result");
                None
            }
        };

        let envelope = assemble(
            parsed.as_ref(),
            &prompt,
            task.template_name(),
            ctx.url.as_deref(),
        );
        let output_path = envelope.persist(ctx.results_dir())?;

        Ok(PipelineOutcome {
            task,
            parsed,
            envelope,
            output_path,
        })
    }
}
