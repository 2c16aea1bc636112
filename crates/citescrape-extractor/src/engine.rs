//! The contract every extraction engine fulfils, and the per-run context

use crate::output_model::OutputModelList;
use async_trait::async_trait;
use citescrape_domain::Task;
use std::fmt;
use std::path::{Path, PathBuf};

/// A producer of raw answer text
///
/// Engines are black boxes to the pipeline. They may retry and re-plan
/// internally but never return errors: any internal failure is logged by the
/// engine and reported as `None`.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Short name for logs (`browser_use`, `bright_data_mcp`, `pdf_scraper`)
    fn name(&self) -> &str;

    /// Run the task and return the final answer text, if any
    async fn run(&self, task: &Task, schema: &OutputModelList, ctx: &RunContext) -> Option<String>;

    /// Release sessions, pages and other handles
    async fn close(&self) {}
}

/// Direction of a scroll action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards the top of the page
    Up,
    /// Towards the bottom of the page
    Down,
}

impl ScrollDirection {
    /// Lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

/// An action performed before the engine starts reasoning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialAction {
    /// Scroll by `amount` pixels
    Scroll {
        /// Which way
        direction: ScrollDirection,
        /// Pixels
        amount: u32,
    },
    /// Open another URL
    GoToUrl(String),
}

impl InitialAction {
    /// Parse a configured action from its name and argument
    ///
    /// Returns `None` for unknown actions or unusable arguments; callers log
    /// and skip those.
    ///
    /// ```
    /// use citescrape_extractor::{InitialAction, ScrollDirection};
    ///
    /// assert_eq!(
    ///     InitialAction::parse("scroll_down", "500"),
    ///     Some(InitialAction::Scroll { direction: ScrollDirection::Down, amount: 500 })
    /// );
    /// assert_eq!(InitialAction::parse("hover", "x"), None);
    /// ```
    pub fn parse(name: &str, argument: &str) -> Option<Self> {
        let argument = argument.trim();
        match name {
            "scroll_down" | "scroll_up" => {
                let direction = if name == "scroll_up" {
                    ScrollDirection::Up
                } else {
                    ScrollDirection::Down
                };
                argument
                    .parse()
                    .ok()
                    .map(|amount| InitialAction::Scroll { direction, amount })
            }
            "go_to_url" if !argument.is_empty() => Some(InitialAction::GoToUrl(argument.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for InitialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialAction::Scroll { direction, amount } => {
                write!(f, "scroll_{} {{amount: {}}}", direction.as_str(), amount)
            }
            InitialAction::GoToUrl(url) => write!(f, "go_to_url {{url: {}}}", url),
        }
    }
}

/// Everything about a run that engines need besides the task and schema
///
/// Built once per run and passed explicitly to the pipeline and engines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Where results and engine artefacts are written
    pub results_dir: Option<PathBuf>,
    /// Page to start from (browser and proxy runs)
    pub url: Option<String>,
    /// The user's prompt as written, set by the pipeline
    pub prompt: Option<String>,
    /// Documents to read (PDF runs)
    pub file_paths: Vec<PathBuf>,
    /// Extra context supplied by the profile
    pub additional_context: Option<String>,
    /// Actions to perform before the agent loop
    pub initial_actions: Vec<InitialAction>,
}

impl RunContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the results directory
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// Set the input documents
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.file_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the additional context
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Set the initial actions
    pub fn with_initial_actions(mut self, actions: Vec<InitialAction>) -> Self {
        self.initial_actions = actions;
        self
    }

    /// Results directory, if any
    pub fn results_dir(&self) -> Option<&Path> {
        self.results_dir.as_deref()
    }

    /// The prompt, or `fallback` when none was set
    pub fn prompt_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.prompt.as_deref().unwrap_or(fallback)
    }

    /// Additional context or an empty string
    pub fn context_text(&self) -> &str {
        self.additional_context.as_deref().unwrap_or_default()
    }
}
