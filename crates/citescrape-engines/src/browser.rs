//! LLM-driven browser agent
//!
//! The agent opens the start page, performs the configured initial actions,
//! then loops: show the model the task, the output schema, what happened so
//! far and the current page, and carry out the single action it answers
//! with. A `done` action ends the run with its result.
//!
//! ```text
//! navigate(url) → initial actions → [plan?] → prompt → action → observe → ... → done
//! ```

use crate::artifacts::{write_json, write_text, DOWNLOADS_DIR, LOCAL_DIR, TRACE_DIR, TRACE_FILE};
use crate::config::{AgentSettings, BrowserSettings};
use crate::driver::{BrowserDriver, PageState};
use crate::error::EngineError;
use crate::pdf_agent::PdfAgent;
use async_trait::async_trait;
use citescrape_domain::{Task, TaskPrompt};
use citescrape_extractor::{
    render_task, strip_code_fences, ExtractionEngine, InitialAction, OutputModelList, RunContext,
    ScrollDirection, PDF_DEFAULT_TEMPLATE,
};
use citescrape_llm::LlmProvider;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Consecutive failed LLM calls before the run is abandoned
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

const MAX_LINKS_SHOWN: usize = 100;
const HISTORY_WINDOW: usize = 20;
const DEFAULT_SCROLL_AMOUNT: u32 = 500;

/// System prompt for every agent step
pub const AGENT_SYSTEM: &str = r#"You are a browser agent collecting information from websites.
Each turn you see the task, the required output format, your previous steps and the current page.
Reply with exactly one JSON object choosing the next action:

{"action": "go_to_url", "url": "<absolute url>"}
{"action": "click", "index": <link number>}
{"action": "scroll", "direction": "down" | "up", "amount": <pixels>}
{"action": "download", "url": "<file url>"}
{"action": "extract_pdf", "path": "<file name reported by download>", "prompt": "<what to look for>"}
{"action": "done", "result": <final answer following the output format>}

Only report information found on the pages you visited. Reply with JSON only."#;

/// System prompt for the planner model
pub const PLANNER_SYSTEM: &str = "You plan the work of a browser agent. \
Given the task, the steps taken so far and the current page, reply with a short numbered plan \
(at most five steps) for finishing the task. Plain text only.";

/// One action chosen by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    /// Open a URL
    GoToUrl {
        /// Target
        url: String,
    },
    /// Follow a numbered link
    Click {
        /// Link number on the current page
        index: usize,
    },
    /// Scroll the current page
    Scroll {
        /// `up` or `down`
        direction: String,
        /// Pixels
        #[serde(default = "default_scroll_amount")]
        amount: u32,
    },
    /// Save a file under the downloads directory
    Download {
        /// File URL, absolute or relative to the current page
        url: String,
    },
    /// Read a downloaded document
    ExtractPdf {
        /// Local path of the document
        path: String,
        /// What to look for
        prompt: String,
    },
    /// Finish with a result
    Done {
        /// The final answer
        result: Value,
    },
}

fn default_scroll_amount() -> u32 {
    DEFAULT_SCROLL_AMOUNT
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentAction::GoToUrl { url } => write!(f, "go_to_url {{url: {}}}", url),
            AgentAction::Click { index } => write!(f, "click {{index: {}}}", index),
            AgentAction::Scroll { direction, amount } => {
                write!(f, "scroll_{} {{amount: {}}}", direction, amount)
            }
            AgentAction::Download { url } => write!(f, "download {{url: {}}}", url),
            AgentAction::ExtractPdf { path, .. } => write!(f, "extract_pdf {{path: {}}}", path),
            AgentAction::Done { .. } => write!(f, "done"),
        }
    }
}

/// Parse a model reply into an action
///
/// Tolerates code fences and prose around a single JSON object.
pub fn parse_action(reply: &str) -> Result<AgentAction, String> {
    let cleaned = strip_code_fences(reply);
    if let Ok(action) = serde_json::from_str(&cleaned) {
        return Ok(action);
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str(&cleaned[start..=end]).map_err(|e| e.to_string())
        }
        _ => Err("reply contains no JSON object".to_string()),
    }
}

fn parse_direction(direction: &str) -> Option<ScrollDirection> {
    match direction.trim().to_ascii_lowercase().as_str() {
        "down" => Some(ScrollDirection::Down),
        "up" => Some(ScrollDirection::Up),
        _ => None,
    }
}

// String results are used as they are, anything else is serialised
fn result_text(result: Value) -> Option<String> {
    match result {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// `https://Example.com/a?b=1` → `example-com-a-b-1`
pub fn url_slug(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let mut slug = String::new();
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').chars().take(50).collect()
}

/// Records a run under the results directory
///
/// Pages are numbered in first-visit order. With snapshots on, the text of
/// every new page goes to `local/webpage-<n>/<slug>.md`. `trace/trace.json`
/// is rewritten after every visit and step.
struct RunRecorder {
    results_dir: Option<PathBuf>,
    save_snapshots: bool,
    pages: Vec<String>,
    snapshots: HashMap<String, PathBuf>,
    history: Map<String, Value>,
}

impl RunRecorder {
    fn new(results_dir: Option<&Path>, save_snapshots: bool) -> Self {
        Self {
            results_dir: results_dir.map(Path::to_path_buf),
            save_snapshots,
            pages: Vec::new(),
            snapshots: HashMap::new(),
            history: Map::new(),
        }
    }

    fn visit(&mut self, page: &PageState) {
        let Some(root) = &self.results_dir else {
            return;
        };
        if self.pages.contains(&page.url) {
            return;
        }
        self.pages.push(page.url.clone());

        if self.save_snapshots {
            let dir = root.join(LOCAL_DIR).join(format!("webpage-{}", self.pages.len()));
            let body = format!("# {}\n\n{}\n\n{}", page.title, page.url, page.text);
            if let Some(path) = write_text(&dir, &format!("{}.md", url_slug(&page.url)), &body) {
                self.snapshots.insert(page.url.clone(), path);
            }
        }
        self.write_trace();
    }

    fn step(&mut self, step: u32, action: &str, error: Option<&str>, page: &PageState) {
        if self.results_dir.is_none() {
            return;
        }
        let snapshot = self
            .snapshots
            .get(&page.url)
            .map(|path| path.display().to_string());
        self.history.insert(
            step.to_string(),
            json!({
                "action": action,
                "errors": error,
                "url": page.url,
                "webpage_file_path": snapshot,
            }),
        );
        self.write_trace();
    }

    fn write_trace(&self) {
        let Some(root) = &self.results_dir else {
            return;
        };
        let numbers: Map<String, Value> = self
            .pages
            .iter()
            .enumerate()
            .map(|(idx, url)| (url.clone(), Value::from(idx + 1)))
            .collect();
        let trace = json!({
            "url_to_webpage_number_mapper": numbers,
            "urls": self.pages,
            "history": self.history,
        });
        write_json(&root.join(TRACE_DIR), TRACE_FILE, &trace);
    }
}

fn downloads_dir(ctx: &RunContext) -> Result<PathBuf, EngineError> {
    ctx.results_dir()
        .map(|dir| dir.join(DOWNLOADS_DIR))
        .ok_or_else(|| EngineError::Config("downloads need a results directory".to_string()))
}

/// Resolve a model-chosen path to a file inside the downloads directory
///
/// Relative paths are taken from the downloads directory. Anything that
/// resolves elsewhere, including through `..` or symlinks, is refused.
fn downloaded_file(path: &str, ctx: &RunContext) -> Result<PathBuf, EngineError> {
    let root = downloads_dir(ctx)?
        .canonicalize()
        .map_err(|_| EngineError::Document("nothing has been downloaded".to_string()))?;
    let requested = Path::new(path);
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let resolved = candidate
        .canonicalize()
        .map_err(|e| EngineError::Document(format!("{}: {}", path, e)))?;
    if !resolved.starts_with(&root) || !resolved.is_file() {
        return Err(EngineError::Document(format!(
            "{} is not a file in the downloads directory",
            path
        )));
    }
    Ok(resolved)
}

/// Browser agent over any [`BrowserDriver`]
pub struct BrowserAgent<D: BrowserDriver> {
    driver: D,
    llm: Arc<dyn LlmProvider>,
    planner: Option<Arc<dyn LlmProvider>>,
    agent: AgentSettings,
    browser: BrowserSettings,
    pdf: Option<PdfAgent>,
}

impl<D: BrowserDriver> BrowserAgent<D> {
    /// Create an agent without planner or document support
    pub fn new(
        driver: D,
        llm: Arc<dyn LlmProvider>,
        agent: AgentSettings,
        browser: BrowserSettings,
    ) -> Self {
        Self {
            driver,
            llm,
            planner: None,
            agent,
            browser,
            pdf: None,
        }
    }

    /// Model asked for a plan every `planner_interval` steps when the planner is enabled
    pub fn with_planner(mut self, planner: Arc<dyn LlmProvider>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Agent used for the `extract_pdf` action
    pub fn with_pdf_agent(mut self, pdf: PdfAgent) -> Self {
        self.pdf = Some(pdf);
        self
    }

    /// The driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run the step loop, surfacing internal failures
    pub async fn extract(
        &self,
        task: &Task,
        schema: &OutputModelList,
        ctx: &RunContext,
    ) -> Result<Option<String>, EngineError> {
        let url = ctx
            .url
            .as_deref()
            .ok_or_else(|| EngineError::Config("browser runs need a url".to_string()))?;

        let mut recorder = RunRecorder::new(ctx.results_dir(), self.browser.save_snapshots);
        let mut page = self.driver.navigate(url).await?;
        recorder.visit(&page);

        for action in &ctx.initial_actions {
            match self.initial_action(action).await {
                Ok(next) => {
                    page = next;
                    recorder.visit(&page);
                }
                Err(e) => warn!(%action, error = %e, "Initial action failed"),
            }
        }

        let schema_text = schema.json_schema_pretty();
        let planner = self.planner.as_ref().filter(|_| self.agent.use_planner);
        let interval = self.agent.planner_interval.max(1);
        let mut history: Vec<String> = Vec::new();
        let mut plan: Option<String> = None;
        let mut failures = 0;

        for step in 1..=self.agent.max_steps {
            if let Some(planner) = planner.filter(|_| (step - 1) % interval == 0) {
                match planner.chat(PLANNER_SYSTEM, &self.planner_prompt(task, &history, &page)).await {
                    Ok(new_plan) => {
                        debug!(step, "Plan updated");
                        plan = Some(new_plan.trim().to_string());
                    }
                    Err(e) => warn!(step, error = %e, "Planner call failed"),
                }
            }

            let prompt = self.step_prompt(task, &schema_text, ctx, &history, plan.as_deref(), &page, step);
            let reply = match self.llm.chat(AGENT_SYSTEM, &prompt).await {
                Ok(reply) => {
                    failures = 0;
                    reply
                }
                Err(e) => {
                    failures += 1;
                    warn!(step, failures, error = %e, "Agent model call failed");
                    recorder.step(step, "none", Some(e.to_string().as_str()), &page);
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(e.into());
                    }
                    continue;
                }
            };

            let action = match parse_action(&reply) {
                Ok(action) => action,
                Err(reason) => {
                    debug!(step, %reason, "Unusable agent reply");
                    recorder.step(step, "invalid_reply", Some(reason.as_str()), &page);
                    history.push(format!(
                        "Step {}: invalid reply ({}). Answer with one JSON action.",
                        step, reason
                    ));
                    continue;
                }
            };

            info!(step, %action, "Agent action");
            if let AgentAction::Done { result } = action {
                recorder.step(step, "done", None, &page);
                return Ok(result_text(result));
            }

            let outcome = match &action {
                AgentAction::ExtractPdf { path, prompt } => {
                    self.read_document(path, prompt, schema, ctx).await
                }
                AgentAction::Download { url } => self.download(url, ctx).await,
                _ => match self.perform(&action).await {
                    Ok(next) => {
                        let note = format!("now at {}", next.url);
                        page = next;
                        recorder.visit(&page);
                        Ok(note)
                    }
                    Err(e) => Err(e),
                },
            };
            let observation = match outcome {
                Ok(note) => {
                    recorder.step(step, &action.to_string(), None, &page);
                    note
                }
                Err(e) => {
                    recorder.step(step, &action.to_string(), Some(e.to_string().as_str()), &page);
                    format!("failed: {}", e)
                }
            };
            history.push(format!("Step {}: {} -> {}", step, action, observation));
        }

        warn!(max_steps = self.agent.max_steps, "Step limit reached without a result");
        Ok(None)
    }

    async fn initial_action(&self, action: &InitialAction) -> Result<PageState, EngineError> {
        match action {
            InitialAction::GoToUrl(url) => self.driver.navigate(url).await,
            InitialAction::Scroll { direction, amount } => self.driver.scroll(*direction, *amount).await,
        }
    }

    async fn perform(&self, action: &AgentAction) -> Result<PageState, EngineError> {
        match action {
            AgentAction::GoToUrl { url } => self.driver.navigate(url).await,
            AgentAction::Click { index } => self.driver.click(*index).await,
            AgentAction::Scroll { direction, amount } => {
                let direction = parse_direction(direction).ok_or_else(|| {
                    EngineError::Driver(format!("unknown scroll direction '{}'", direction))
                })?;
                self.driver.scroll(direction, *amount).await
            }
            AgentAction::Download { .. } | AgentAction::ExtractPdf { .. } | AgentAction::Done { .. } => {
                self.driver.page().await
            }
        }
    }

    async fn download(&self, url: &str, ctx: &RunContext) -> Result<String, EngineError> {
        let dir = downloads_dir(ctx)?;
        let path = self.driver.download(url, &dir).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(url, file = %name, "File downloaded for the agent");
        Ok(format!("saved as {}", name))
    }

    async fn read_document(
        &self,
        path: &str,
        prompt: &str,
        schema: &OutputModelList,
        ctx: &RunContext,
    ) -> Result<String, EngineError> {
        let pdf = self
            .pdf
            .as_ref()
            .ok_or_else(|| EngineError::Config("document extraction is not available".to_string()))?;
        let file = downloaded_file(path, ctx)?;
        let task = render_task(PDF_DEFAULT_TEMPLATE, &TaskPrompt::from(prompt))
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let mut doc_ctx = RunContext::new().with_files([file.as_path()]).with_prompt(prompt);
        doc_ctx.results_dir = ctx.results_dir.clone();

        info!(path = %file.display(), "Reading document for the agent");
        Ok(match pdf.run(&task, schema, &doc_ctx).await {
            Some(result) => format!(
                "extracted from the document (check it is relevant to the task):\n{}",
                result
            ),
            None => format!("nothing could be extracted from {}", path),
        })
    }

    fn page_section(&self, page: &PageState) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "URL: {}", page.url);
        let _ = writeln!(out, "Title: {}", page.title);
        let _ = writeln!(out, "Links:");
        for (idx, link) in page.links.iter().take(MAX_LINKS_SHOWN).enumerate() {
            let _ = writeln!(out, "[{}] {} -> {}", idx, link.text, link.href);
        }
        if page.links.len() > MAX_LINKS_SHOWN {
            let _ = writeln!(out, "... {} more links", page.links.len() - MAX_LINKS_SHOWN);
        }
        let text: String = page.text.chars().take(self.browser.max_page_chars).collect();
        let _ = write!(out, "Content:\n{}", text);
        out
    }

    fn history_section(history: &[String]) -> String {
        if history.is_empty() {
            return "None".to_string();
        }
        let skip = history.len().saturating_sub(HISTORY_WINDOW);
        history[skip..].join("\n")
    }

    #[allow(clippy::too_many_arguments)]
    fn step_prompt(
        &self,
        task: &Task,
        schema: &str,
        ctx: &RunContext,
        history: &[String],
        plan: Option<&str>,
        page: &PageState,
        step: u32,
    ) -> String {
        let additional = match ctx.context_text() {
            "" => "None provided",
            text => text,
        };
        let mut out = format!(
            "Task:\n{}\n\nOutput format (JSON schema of the done result):\n{}\n\nAdditional context: {}\n",
            task.text(),
            schema,
            additional
        );
        if let Some(plan) = plan {
            let _ = write!(out, "\nPlan:\n{}\n", plan);
        }
        let _ = write!(
            out,
            "\nPrevious steps:\n{}\n\nCurrent page (step {} of {}):\n{}",
            Self::history_section(history),
            step,
            self.agent.max_steps,
            self.page_section(page)
        );
        out
    }

    fn planner_prompt(&self, task: &Task, history: &[String], page: &PageState) -> String {
        format!(
            "Task:\n{}\n\nSteps so far:\n{}\n\nCurrent page: {} ({})",
            task.text(),
            Self::history_section(history),
            page.title,
            page.url
        )
    }
}

#[async_trait]
impl<D: BrowserDriver> ExtractionEngine for BrowserAgent<D> {
    fn name(&self) -> &str {
        "browser_use"
    }

    async fn run(&self, task: &Task, schema: &OutputModelList, ctx: &RunContext) -> Option<String> {
        match self.extract(task, schema, ctx).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(engine = self.name(), error = %e, "Browser extraction failed");
                None
            }
        }
    }

    async fn close(&self) {
        if let Err(e) = self.driver.close().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }
    }
}
