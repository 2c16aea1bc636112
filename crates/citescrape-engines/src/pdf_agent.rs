//! Retrieval-augmented extraction from PDF and text documents

use crate::artifacts::write_json;
use crate::chunking::TextChunker;
use crate::config::PdfSettings;
use crate::document::load_document;
use crate::error::EngineError;
use crate::retrieval::{top_k, HashingVectorizer, ScoredChunk};
use async_trait::async_trait;
use citescrape_domain::Task;
use citescrape_extractor::{strip_code_fences, ExtractionEngine, OutputModelList, RunContext};
use citescrape_llm::LlmProvider;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Directory under the results directory holding raw responses
pub const PDF_LOG_DIR: &str = "pdf_logs";

/// Answers a task from the chunks of a set of documents most similar to the prompt
pub struct PdfAgent {
    llm: Arc<dyn LlmProvider>,
    settings: PdfSettings,
    vectorizer: HashingVectorizer,
}

impl PdfAgent {
    /// Create an agent
    pub fn new(llm: Arc<dyn LlmProvider>, settings: PdfSettings) -> Self {
        Self {
            llm,
            settings,
            vectorizer: HashingVectorizer::default(),
        }
    }

    /// Run the extraction, surfacing internal failures
    pub async fn extract(
        &self,
        task: &Task,
        schema: &OutputModelList,
        ctx: &RunContext,
    ) -> Result<Option<String>, EngineError> {
        self.settings.validate()?;
        if ctx.file_paths.is_empty() {
            return Err(EngineError::Config("no documents to read".to_string()));
        }

        let prompt = ctx.prompt_or(task.text());
        let Some(excerpts) = self.retrieve(&ctx.file_paths, prompt).await? else {
            return Ok(None);
        };

        let request = self.build_prompt(task, prompt, ctx, &excerpts, &schema.json_schema_pretty());
        let raw = self.llm.generate(&request).await?;
        if let Some(dir) = ctx.results_dir() {
            log_response(dir, &raw);
        }

        let cleaned = strip_code_fences(&raw);
        if cleaned.is_empty() {
            return Ok(None);
        }
        if is_json(&cleaned) || !self.settings.repair_json {
            return Ok(Some(cleaned));
        }

        warn!("Document answer is not valid JSON, asking the model to repair it");
        let repaired = strip_code_fences(&self.llm.generate(&repair_prompt(&cleaned)).await?);
        if is_json(&repaired) {
            Ok(Some(repaired))
        } else {
            warn!("Repair round did not produce valid JSON");
            Ok(Some(cleaned))
        }
    }

    async fn retrieve(
        &self,
        paths: &[PathBuf],
        query: &str,
    ) -> Result<Option<Vec<ScoredChunk>>, EngineError> {
        let chunker = TextChunker::new(
            self.settings.chunk_strategy,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        );

        let mut chunks = Vec::new();
        let mut loaded = 0;
        for path in paths {
            match load_document(path).await {
                Ok(doc) => {
                    loaded += 1;
                    let source = doc.source.display().to_string();
                    chunks.extend(chunker.chunk(&doc.text).into_iter().map(|c| (source.clone(), c)));
                    info!(path = %path.display(), "Document processed");
                }
                Err(e) => error!(path = %path.display(), error = %e, "Skipping document"),
            }
        }

        if loaded == 0 {
            error!("No document could be loaded");
            return Ok(None);
        }
        if chunks.is_empty() {
            warn!("Documents contain no text");
            return Ok(None);
        }

        let total = chunks.len();
        let excerpts = top_k(&self.vectorizer, query, chunks, self.settings.top_k);
        debug!(total, kept = excerpts.len(), "Chunks ranked");
        Ok(Some(excerpts))
    }

    fn build_prompt(
        &self,
        task: &Task,
        prompt: &str,
        ctx: &RunContext,
        excerpts: &[ScoredChunk],
        schema: &str,
    ) -> String {
        let mut out = String::from("Document(s):\n");
        for path in &ctx.file_paths {
            let _ = writeln!(out, "  {}", path.display());
        }
        let additional = match ctx.context_text() {
            "" => "None provided",
            text => text,
        };
        let _ = write!(
            out,
            "\nTask: {}\nPrompt: {}\nAdditional context: {}\n\nRelevant excerpts:\n",
            task.text(),
            prompt,
            additional
        );
        for (idx, excerpt) in excerpts.iter().enumerate() {
            let _ = write!(out, "\n[{}] ({})\n{}\n", idx + 1, excerpt.source, excerpt.text);
        }
        let _ = write!(
            out,
            "\nExtract the requested information from the excerpts above. \
             Answer with JSON only, following this schema:\n{}\n",
            schema
        );
        out
    }
}

fn is_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

fn repair_prompt(text: &str) -> String {
    format!(
        "The following text should be valid JSON but may have formatting issues.\n\
         Convert it to proper, valid JSON:\n\n{}\n\n\
         Return ONLY the corrected JSON with no additional text or explanation.",
        text
    )
}

fn log_response(results_dir: &Path, raw: &str) {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    write_json(
        &results_dir.join(PDF_LOG_DIR),
        &format!("pdf_response_{}.json", stamp),
        &json!({ "response": raw }),
    );
}

#[async_trait]
impl ExtractionEngine for PdfAgent {
    fn name(&self) -> &str {
        "pdf_scraper"
    }

    async fn run(&self, task: &Task, schema: &OutputModelList, ctx: &RunContext) -> Option<String> {
        match self.extract(task, schema, ctx).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(engine = self.name(), error = %e, "Document extraction failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citescrape_domain::ContentFieldSpec;
    use citescrape_extractor::build_output_model;
    use citescrape_llm::MockProvider;

    fn schema() -> OutputModelList {
        build_output_model(&ContentFieldSpec::text_default())
    }

    #[test]
    fn test_repair_prompt_embeds_text() {
        let prompt = repair_prompt("{'a': 1}");
        assert!(prompt.contains("{'a': 1}"));
        assert!(prompt.contains("ONLY the corrected JSON"));
    }

    #[tokio::test]
    async fn test_no_files_is_a_config_error() {
        let agent = PdfAgent::new(Arc::new(MockProvider::default()), PdfSettings::default());
        let task = Task::new("t", "pdf_default");

        let err = agent.extract(&task, &schema(), &RunContext::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(agent.run(&task, &schema(), &RunContext::new()).await, None);
    }

    #[tokio::test]
    async fn test_fenced_answer_is_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("report.txt");
        std::fs::write(&doc, "Revenue was 12 million.").unwrap();

        let llm = Arc::new(MockProvider::new("```json\n{\"text\": \"12 million\"}\n```"));
        let agent = PdfAgent::new(llm.clone(), PdfSettings::default());
        let ctx = RunContext::new().with_files([doc]).with_prompt("revenue");

        let answer = agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await;
        assert_eq!(answer.as_deref(), Some("{\"text\": \"12 million\"}"));
        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompts()[0].contains("Revenue was 12 million."));
    }
}
