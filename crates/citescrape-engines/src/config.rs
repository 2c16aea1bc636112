//! Engine settings, one table per engine
//!
//! Every table deserialises with defaults for missing keys, so an empty
//! configuration file is a valid one.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the web-unlocker API token
pub const PROXY_TOKEN_ENV: &str = "BRIGHTDATA_API_KEY";

/// Default web-unlocker request endpoint
pub const DEFAULT_PROXY_ENDPOINT: &str = "https://api.brightdata.com/request";

/// How documents are cut into retrievable chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Split on blank lines
    #[default]
    ByParagraph,
    /// Split before markdown headings and numbered headings
    BySection,
    /// Split on sentence ends
    ByTokenCount,
}

/// The `[agent]` table: browser agent step loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Steps before the agent gives up
    pub max_steps: u32,
    /// Ask the planner model for a plan every `planner_interval` steps
    pub use_planner: bool,
    /// Steps between planner calls
    pub planner_interval: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            use_planner: false,
            planner_interval: 10,
        }
    }
}

/// The `[browser]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// User-Agent header sent with page requests
    pub user_agent: String,
    /// Connection timeout
    pub timeout_secs: u64,
    /// Wait after every page load
    pub min_page_load_secs: f64,
    /// Upper bound on a single page load
    pub max_page_load_secs: f64,
    /// Page text shown to the model per step
    pub max_page_chars: usize,
    /// Write the text of every visited page under the results directory
    pub save_snapshots: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("citescrape/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            min_page_load_secs: 1.0,
            max_page_load_secs: 5.0,
            max_page_chars: 20_000,
            save_snapshots: false,
        }
    }
}

impl BrowserSettings {
    /// Wait after a page load
    pub fn min_page_load(&self) -> Result<Duration, EngineError> {
        seconds("browser.min_page_load_secs", self.min_page_load_secs)
    }

    /// Timeout of a single page load
    pub fn max_page_load(&self) -> Result<Duration, EngineError> {
        seconds("browser.max_page_load_secs", self.max_page_load_secs)
    }

    /// Validate the page load bounds
    pub fn validate(&self) -> Result<(), EngineError> {
        let min = self.min_page_load()?;
        let max = self.max_page_load()?;
        if max.is_zero() {
            return Err(EngineError::Config(
                "browser.max_page_load_secs must be greater than 0".to_string(),
            ));
        }
        if min > max {
            return Err(EngineError::Config(format!(
                "browser.min_page_load_secs ({}) must not exceed browser.max_page_load_secs ({})",
                self.min_page_load_secs, self.max_page_load_secs
            )));
        }
        Ok(())
    }
}

// Finite, non-negative and small enough for a Duration
fn seconds(key: &str, value: f64) -> Result<Duration, EngineError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        EngineError::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            key, value
        ))
    })
}

/// The `[proxy]` table: web-unlocking proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Request endpoint
    pub endpoint: String,
    /// Unlocker zone name
    pub zone: Option<String>,
    /// API token; `BRIGHTDATA_API_KEY` wins when both are set
    pub api_token: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
    /// Page markdown passed to the model
    pub max_page_chars: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            zone: None,
            api_token: None,
            timeout_secs: 120,
            max_page_chars: 50_000,
        }
    }
}

impl ProxySettings {
    /// Resolve the API token, preferring the environment over the file
    pub fn resolve_api_token<F>(&self, env: F) -> Result<String, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env(PROXY_TOKEN_ENV)
            .or_else(|| self.api_token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                EngineError::Config(format!(
                    "proxy runs need an API token (set {} or proxy.api_token)",
                    PROXY_TOKEN_ENV
                ))
            })
    }

    /// The configured zone
    pub fn resolve_zone(&self) -> Result<String, EngineError> {
        self.zone
            .clone()
            .filter(|zone| !zone.trim().is_empty())
            .ok_or_else(|| EngineError::Config("proxy.zone must be set".to_string()))
    }
}

/// The `[pdf]` table: document retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters repeated from the end of the previous chunk
    pub chunk_overlap: usize,
    /// Where chunks are cut
    pub chunk_strategy: ChunkStrategy,
    /// Chunks passed to the model
    pub top_k: usize,
    /// Ask the model once to repair an answer that is not valid JSON
    pub repair_json: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            chunk_strategy: ChunkStrategy::ByParagraph,
            top_k: 4,
            repair_json: true,
        }
    }
}

impl PdfSettings {
    /// Validate the chunking parameters
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.chunk_size == 0 {
            return Err(EngineError::Config("pdf.chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(EngineError::Config(format!(
                "pdf.chunk_overlap ({}) must be smaller than pdf.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(EngineError::Config("pdf.top_k must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// All engine tables together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `[agent]`
    pub agent: AgentSettings,
    /// `[browser]`
    pub browser: BrowserSettings,
    /// `[proxy]`
    pub proxy: ProxySettings,
    /// `[pdf]`
    pub pdf: PdfSettings,
}

impl EngineSettings {
    /// Validate every table that has constraints
    pub fn validate(&self) -> Result<(), EngineError> {
        self.browser.validate()?;
        self.pdf.validate()
    }
}
