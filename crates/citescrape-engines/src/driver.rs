//! Browser drivers: the page-level operations the browser agent relies on

use crate::config::BrowserSettings;
use crate::error::EngineError;
use async_trait::async_trait;
use citescrape_extractor::ScrollDirection;
use reqwest::Url;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// A link on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Visible text, or the target when the link has none
    pub text: String,
    /// Absolute target URL
    pub href: String,
}

/// What the agent sees of the current page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    /// Current URL
    pub url: String,
    /// Document title
    pub title: String,
    /// Visible text (markdown) from the current scroll position
    pub text: String,
    /// Links, indexed for `click`
    pub links: Vec<Link>,
}

/// Operations on one browser session
///
/// Implementations hold the session state; every operation returns the page
/// as it is afterwards.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open `url`
    async fn navigate(&self, url: &str) -> Result<PageState, EngineError>;

    /// The current page
    async fn page(&self) -> Result<PageState, EngineError>;

    /// Follow the link at `index` of the current page
    async fn click(&self, index: usize) -> Result<PageState, EngineError>;

    /// Scroll the current page
    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<PageState, EngineError>;

    /// Save the file at `url` into `dir` and return its path
    ///
    /// Relative URLs resolve against the current page.
    async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, EngineError>;

    /// End the session
    async fn close(&self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    title: String,
    markdown: String,
    links: Vec<Link>,
    offset: usize,
}

/// Driver over plain HTTP requests
///
/// Pages are fetched with reqwest and rendered to markdown; no script runs.
/// Having no layout, a scroll moves the visible text window by `amount`
/// characters.
pub struct HttpBrowserDriver {
    client: reqwest::Client,
    settings: BrowserSettings,
    current: Mutex<Option<LoadedPage>>,
}

impl HttpBrowserDriver {
    /// Create a driver from `[browser]` settings
    pub fn new(settings: &BrowserSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings: settings.clone(),
            current: Mutex::new(None),
        })
    }

    fn state(&self, page: &LoadedPage) -> PageState {
        PageState {
            url: page.url.clone(),
            title: page.title.clone(),
            text: page
                .markdown
                .chars()
                .skip(page.offset)
                .take(self.settings.max_page_chars)
                .collect(),
            links: page.links.clone(),
        }
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowserDriver {
    async fn navigate(&self, url: &str) -> Result<PageState, EngineError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.max_page_load()?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Http(format!("{} returned {}", url, status)));
        }
        let final_url = response.url().to_string();
        let html = response.text().await?;

        let wait = self.settings.min_page_load()?;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let page = parse_page(&final_url, &html)?;
        debug!(url = %page.url, links = page.links.len(), "Page loaded");
        let state = self.state(&page);
        *self.current.lock().await = Some(page);
        Ok(state)
    }

    async fn page(&self) -> Result<PageState, EngineError> {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|page| self.state(page))
            .ok_or_else(|| EngineError::Driver("no page is open".to_string()))
    }

    async fn click(&self, index: usize) -> Result<PageState, EngineError> {
        let target = {
            let current = self.current.lock().await;
            let page = current
                .as_ref()
                .ok_or_else(|| EngineError::Driver("no page is open".to_string()))?;
            page.links
                .get(index)
                .map(|link| link.href.clone())
                .ok_or_else(|| {
                    EngineError::Driver(format!(
                        "no link with index {} ({} links on the page)",
                        index,
                        page.links.len()
                    ))
                })?
        };
        self.navigate(&target).await
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<PageState, EngineError> {
        let mut current = self.current.lock().await;
        let page = current
            .as_mut()
            .ok_or_else(|| EngineError::Driver("no page is open".to_string()))?;

        let len = page.markdown.chars().count();
        page.offset = match direction {
            ScrollDirection::Down => (page.offset + amount as usize).min(len.saturating_sub(1)),
            ScrollDirection::Up => page.offset.saturating_sub(amount as usize),
        };
        Ok(self.state(page))
    }

    async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, EngineError> {
        let resolved = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(page) => Url::parse(&page.url).and_then(|base| base.join(url)),
                None => Url::parse(url),
            }
        };
        let target = resolved
            .map_err(|e| EngineError::Driver(format!("bad download url '{}': {}", url, e)))?;

        let response = self
            .client
            .get(target.clone())
            .timeout(self.settings.max_page_load()?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Http(format!("{} returned {}", target, status)));
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = free_path(dir, &download_file_name(&target));
        tokio::fs::write(&path, &bytes).await?;
        debug!(url = %target, path = %path.display(), bytes = bytes.len(), "File downloaded");
        Ok(path)
    }

    async fn close(&self) -> Result<(), EngineError> {
        *self.current.lock().await = None;
        Ok(())
    }
}

/// Last path segment of `url`, reduced to `[A-Za-z0-9._-]`
fn download_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
        .collect();
    let name = name.trim_start_matches('.');
    if name.is_empty() {
        "download".to_string()
    } else {
        name.to_string()
    }
}

// `name`, or `<n>-name` when that file exists already
fn free_path(dir: &Path, name: &str) -> PathBuf {
    let mut path = dir.join(name);
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}", n, name));
        n += 1;
    }
    path
}

fn selector(css: &str) -> Result<Selector, EngineError> {
    Selector::parse(css).map_err(|e| EngineError::Driver(format!("bad selector '{}': {}", css, e)))
}

fn parse_page(url: &str, html: &str) -> Result<LoadedPage, EngineError> {
    let base = Url::parse(url).map_err(|e| EngineError::Driver(format!("bad url '{}': {}", url, e)))?;
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let mut links = Vec::new();
    for anchor in document.select(&selector("a[href]")?) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        let Ok(target) = base.join(href) else {
            continue;
        };
        let text = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
        links.push(Link {
            text: if text.is_empty() { target.to_string() } else { text },
            href: target.to_string(),
        });
    }

    Ok(LoadedPage {
        url: url.to_string(),
        title,
        markdown: html2md::parse_html(html),
        links,
        offset: 0,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
