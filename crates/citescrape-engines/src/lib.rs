//! citescrape Engines
//!
//! The three [`ExtractionEngine`] adapters and their collaborators:
//!
//! - [`BrowserAgent`]: LLM-driven step loop over a [`BrowserDriver`]
//! - [`ProxyAgent`]: one page fetched through a web-unlocking proxy, one LLM call
//! - [`PdfAgent`]: chunk, rank and ask over local PDF and text documents
//!
//! Engines never fail across the contract. Internal errors ([`EngineError`])
//! are logged by the adapter and reported as "no result".

#![warn(missing_docs)]

pub mod artifacts;
pub mod browser;
pub mod chunking;
pub mod config;
pub mod document;
pub mod driver;
pub mod error;
pub mod pdf_agent;
pub mod proxy;
pub mod retrieval;

pub use browser::{AgentAction, BrowserAgent};
pub use chunking::TextChunker;
pub use config::{AgentSettings, BrowserSettings, ChunkStrategy, EngineSettings, PdfSettings, ProxySettings};
pub use document::{load_document, Document};
pub use driver::{BrowserDriver, HttpBrowserDriver, Link, PageState};
pub use error::EngineError;
pub use pdf_agent::PdfAgent;
pub use proxy::{ProxyAgent, UnlockerClient};

use citescrape_extractor::{ExtractionEngine, DEFAULT_TEMPLATE, PDF_DEFAULT_TEMPLATE};
use citescrape_llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Which engine a profile runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperKind {
    /// Browser agent
    #[default]
    BrowserUse,
    /// Web-unlocking proxy agent
    BrightDataMcp,
    /// Document agent
    PdfScraper,
}

impl ScraperKind {
    /// Every kind
    pub const ALL: [ScraperKind; 3] = [
        ScraperKind::BrowserUse,
        ScraperKind::BrightDataMcp,
        ScraperKind::PdfScraper,
    ];

    /// Configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperKind::BrowserUse => "browser_use",
            ScraperKind::BrightDataMcp => "bright_data_mcp",
            ScraperKind::PdfScraper => "pdf_scraper",
        }
    }

    /// Template used when a profile names none
    pub fn default_template(&self) -> &'static str {
        match self {
            ScraperKind::PdfScraper => PDF_DEFAULT_TEMPLATE,
            _ => DEFAULT_TEMPLATE,
        }
    }

    /// Whether runs need a start URL
    pub fn needs_url(&self) -> bool {
        !matches!(self, ScraperKind::PdfScraper)
    }
}

impl fmt::Display for ScraperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScraperKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScraperKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                EngineError::Config(format!(
                    "unknown scraper type '{}' (expected browser_use, bright_data_mcp or pdf_scraper)",
                    s
                ))
            })
    }
}

/// Build the engine for `kind`, reading secrets from the process environment
///
/// `planner` is used by the browser agent when `agent.use_planner` is set;
/// without it the main model plans too.
pub fn build_engine(
    kind: ScraperKind,
    settings: &EngineSettings,
    llm: Arc<dyn LlmProvider>,
    planner: Option<Arc<dyn LlmProvider>>,
) -> Result<Arc<dyn ExtractionEngine>, EngineError> {
    build_engine_with_env(kind, settings, llm, planner, |var| std::env::var(var).ok())
}

/// Build the engine for `kind` with an explicit environment lookup
pub fn build_engine_with_env<F>(
    kind: ScraperKind,
    settings: &EngineSettings,
    llm: Arc<dyn LlmProvider>,
    planner: Option<Arc<dyn LlmProvider>>,
    env: F,
) -> Result<Arc<dyn ExtractionEngine>, EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    info!(engine = %kind, "Building extraction engine");
    settings.validate()?;

    let engine: Arc<dyn ExtractionEngine> = match kind {
        ScraperKind::BrowserUse => {
            let driver = HttpBrowserDriver::new(&settings.browser)?;
            let mut agent = BrowserAgent::new(
                driver,
                llm.clone(),
                settings.agent.clone(),
                settings.browser.clone(),
            )
            .with_pdf_agent(PdfAgent::new(llm.clone(), settings.pdf.clone()));
            if settings.agent.use_planner {
                agent = agent.with_planner(planner.unwrap_or(llm));
            }
            Arc::new(agent)
        }
        ScraperKind::BrightDataMcp => {
            let unlocker = UnlockerClient::from_settings(&settings.proxy, env)?;
            Arc::new(ProxyAgent::new(unlocker, llm, settings.proxy.max_page_chars))
        }
        ScraperKind::PdfScraper => Arc::new(PdfAgent::new(llm, settings.pdf.clone())),
    };
    Ok(engine)
}
