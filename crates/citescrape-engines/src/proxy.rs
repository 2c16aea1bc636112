//! Extraction through a web-unlocking proxy
//!
//! The page is fetched by the proxy service (which handles blocking, CAPTCHAs
//! and geo restrictions), converted to markdown, and handed to the LLM in one
//! chat request together with the task and the output schema.

use crate::artifacts::{write_json, MCP_LOG_DIR};
use crate::config::ProxySettings;
use crate::error::EngineError;
use async_trait::async_trait;
use citescrape_domain::Task;
use citescrape_extractor::{ExtractionEngine, OutputModelList, RunContext};
use citescrape_llm::LlmProvider;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// System prompt for proxy runs
pub const PROXY_RULES: &str = r#"You are a web scraping agent. Extract information from the provided webpage according to the given prompt.

Where to find things:
1. The page URL follows "URL:".
2. The user's request follows "Prompt:".
3. Extra context, if any, follows "Additional content:".
4. The JSON schema of the answer follows "Output format:".
5. The page itself, as markdown, follows "Page content:".

Rules:
1. The extracted information must be 100% factual and found on the page (DO NOT infer data).
2. Only include information that is relevant to the prompt.
3. If the information is not on the page, say "Information not found" instead of guessing.
4. Answer with JSON only, following the output format."#;

#[derive(Debug, Serialize)]
struct UnlockRequest<'a> {
    zone: &'a str,
    url: &'a str,
    format: &'a str,
}

/// Client for the web-unlocker request API
#[derive(Debug, Clone)]
pub struct UnlockerClient {
    client: reqwest::Client,
    endpoint: String,
    zone: String,
    token: String,
}

impl UnlockerClient {
    /// Create a client
    pub fn new(
        endpoint: impl Into<String>,
        zone: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            zone: zone.into(),
            token: token.into(),
        })
    }

    /// Build from `[proxy]` settings; `env` looks up the token variable
    pub fn from_settings<F>(settings: &ProxySettings, env: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(
            settings.endpoint.clone(),
            settings.resolve_zone()?,
            settings.resolve_api_token(env)?,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// The unlocker zone requests go through
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Fetch the raw HTML of `url` through the proxy
    pub async fn fetch(&self, url: &str) -> Result<String, EngineError> {
        let request = UnlockRequest {
            zone: &self.zone,
            url,
            format: "raw",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Http(format!("unlocker returned {}: {}", status, body)));
        }
        Ok(response.text().await?)
    }
}

/// Single-shot extraction over a proxied page
pub struct ProxyAgent {
    unlocker: UnlockerClient,
    llm: Arc<dyn LlmProvider>,
    max_page_chars: usize,
}

impl ProxyAgent {
    /// Create an agent
    pub fn new(unlocker: UnlockerClient, llm: Arc<dyn LlmProvider>, max_page_chars: usize) -> Self {
        Self {
            unlocker,
            llm,
            max_page_chars,
        }
    }

    /// Run the extraction, surfacing internal failures
    pub async fn extract(
        &self,
        task: &Task,
        schema: &OutputModelList,
        ctx: &RunContext,
    ) -> Result<Option<String>, EngineError> {
        let url = ctx
            .url
            .as_deref()
            .ok_or_else(|| EngineError::Config("proxy runs need a url".to_string()))?;

        info!(url, "Fetching page through proxy");
        let html = self.unlocker.fetch(url).await?;
        let markdown = html2md::parse_html(&html);
        let page: String = markdown.chars().take(self.max_page_chars).collect();
        debug!(chars = page.len(), "Page converted");

        let additional = match ctx.context_text() {
            "" => "None provided",
            text => text,
        };
        let user = format!(
            "URL: {}\nPrompt: {}\nAdditional content: {}\nOutput format: {}\nTask: {}\n\nPage content:\n{}",
            url,
            ctx.prompt_or(task.text()),
            additional,
            schema.json_schema_pretty(),
            task.text(),
            page
        );

        let answer = self.llm.chat(PROXY_RULES, &user).await?;
        if let Some(dir) = ctx.results_dir() {
            self.log_exchange(dir, url, &user, &answer);
        }
        Ok(Some(answer).filter(|a| !a.trim().is_empty()))
    }

    // Readable messages and a structured view of the same exchange
    fn log_exchange(&self, results_dir: &Path, url: &str, user: &str, answer: &str) {
        let dir = results_dir.join(MCP_LOG_DIR);
        let messages = json!([
            format!("System: {}", PROXY_RULES),
            format!("Human: {}", user),
            format!("AI: {}", answer),
        ]);
        let view = json!({
            "tool_calls": [{
                "name": "unlock",
                "args": {"url": url, "zone": self.unlocker.zone(), "format": "raw"},
            }],
            "content": answer,
        });
        write_json(&dir, "print_version.json", &messages);
        write_json(&dir, "json_view.json", &view);
    }
}

#[async_trait]
impl ExtractionEngine for ProxyAgent {
    fn name(&self) -> &str {
        "bright_data_mcp"
    }

    async fn run(&self, task: &Task, schema: &OutputModelList, ctx: &RunContext) -> Option<String> {
        match self.extract(task, schema, ctx).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(engine = self.name(), error = %e, "Proxy extraction failed");
                None
            }
        }
    }
}
