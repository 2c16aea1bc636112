//! Scraping profiles.
//!
//! A profile names what to extract (`[content_structure]`), from where and
//! how (`[scraper]`). Resolution validates it and turns it into a
//! [`RunRequest`] plus the pieces of a [`RunContext`].

use crate::config::PROFILES_DIR_NAME;
use crate::error::{CliError, Result};
use citescrape_domain::{ContentFieldSpec, TabularPrompt, TaskPrompt};
use citescrape_engines::ScraperKind;
use citescrape_extractor::{find_template, InitialAction, RunContext, RunRequest, DEFAULT_TEMPLATE};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// `filepath`: one path or several
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilePaths {
    /// A single path
    One(PathBuf),
    /// A list of paths
    Many(Vec<PathBuf>),
}

impl FilePaths {
    fn into_vec(self) -> Vec<PathBuf> {
        match self {
            FilePaths::One(path) => vec![path],
            FilePaths::Many(paths) => paths,
        }
    }
}

/// How `[scraper.context] value` is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    /// Used as written
    #[default]
    Text,
    /// A JSON object flattened to `key: value` lines
    Json,
}

/// `[scraper.context]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    /// Interpretation of `value`
    pub format: ContextFormat,
    /// The context itself
    pub value: String,
}

/// `[scraper]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScraperSection {
    /// Engine to run
    pub scraper_type: ScraperKind,
    /// Start page
    pub url: Option<String>,
    /// Documents to read
    pub filepath: Option<FilePaths>,
    /// A string, or a table for structured templates
    pub prompt: Option<toml::Value>,
    /// Template name
    pub task_template: Option<String>,
    /// Base directory for results
    pub output_path: Option<PathBuf>,
    /// Extra context for the engine
    pub context: Option<ContextSection>,
    /// Single-key tables such as `{ scroll_down = 500 }`
    pub initial_actions: Vec<toml::Table>,
}

/// A profile file as written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Profile name, used for the results directory
    pub name: Option<String>,
    /// `{ ModelName = { field = "type" } }`
    pub content_structure: toml::Table,
    /// Engine settings for this profile
    pub scraper: ScraperSection,
}

/// A validated profile, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    /// Profile name
    pub name: String,
    /// Engine to run
    pub kind: ScraperKind,
    /// Content spec, template and prompt
    pub request: RunRequest,
    /// Start page
    pub url: Option<String>,
    /// Documents to read
    pub file_paths: Vec<PathBuf>,
    /// Additional context text
    pub additional_context: Option<String>,
    /// Actions performed before the engine starts
    pub initial_actions: Vec<InitialAction>,
    /// Base directory for results from the profile
    pub output_path: Option<PathBuf>,
}

impl ResolvedProfile {
    /// The run context for this profile, without a results directory
    pub fn run_context(&self) -> RunContext {
        let mut ctx = RunContext::new()
            .with_files(self.file_paths.iter().cloned())
            .with_initial_actions(self.initial_actions.clone());
        if let Some(url) = &self.url {
            ctx = ctx.with_url(url.clone());
        }
        if let Some(context) = &self.additional_context {
            ctx = ctx.with_additional_context(context.clone());
        }
        ctx
    }
}

/// Find the profile file for `selector`
///
/// A selector ending in `.toml` or containing a path separator is a path;
/// anything else is a name looked up in `profiles_dir`.
pub fn locate_profile(selector: &str, profiles_dir: &Path) -> PathBuf {
    let as_path = Path::new(selector);
    if as_path.extension().is_some_and(|ext| ext == "toml") || as_path.components().count() > 1 {
        as_path.to_path_buf()
    } else {
        profiles_dir.join(format!("{}.toml", selector))
    }
}

impl Profile {
    /// Load a profile file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Cannot read profile {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse profile text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Content spec declared by `[content_structure]`
    pub fn content_spec(&self) -> Result<ContentFieldSpec> {
        let mut declaration = Vec::with_capacity(self.content_structure.len());
        for (model, fields) in &self.content_structure {
            let table = fields.as_table().ok_or_else(|| {
                CliError::Config(format!("content_structure.{} must be a table of field types", model))
            })?;
            let mut typed = Vec::with_capacity(table.len());
            for (field, tag) in table {
                let tag = tag.as_str().ok_or_else(|| {
                    CliError::Config(format!(
                        "content_structure.{}.{} must be a type name string",
                        model, field
                    ))
                })?;
                typed.push((field.clone(), tag.to_string()));
            }
            declaration.push((model.clone(), typed));
        }
        Ok(ContentFieldSpec::from_declaration(declaration)?)
    }

    /// Validate the profile and resolve everything a run needs.
    ///
    /// `fallback_name` names the profile when the file does not.
    pub fn resolve(self, fallback_name: &str) -> Result<ResolvedProfile> {
        let content = self.content_spec()?;
        let scraper = self.scraper;
        let kind = scraper.scraper_type;

        let url = scraper.url.filter(|u| !u.trim().is_empty());
        if kind.needs_url() && url.is_none() {
            return Err(CliError::Config(format!("scraper.url is required for {} runs", kind)));
        }

        let file_paths = scraper.filepath.map(FilePaths::into_vec).unwrap_or_default();
        if kind == ScraperKind::PdfScraper && file_paths.is_empty() {
            return Err(CliError::Config(format!("scraper.filepath is required for {} runs", kind)));
        }

        let prompt = match scraper.prompt {
            Some(value) => parse_prompt(&value)?,
            None => return Err(CliError::Config("scraper.prompt is required".to_string())),
        };
        if prompt.is_empty() {
            return Err(CliError::Config("scraper.prompt must not be empty".to_string()));
        }

        let template_name = resolve_template_name(scraper.task_template.as_deref(), kind);
        let additional_context = scraper.context.and_then(context_text);
        let initial_actions = parse_initial_actions(&scraper.initial_actions);

        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());
        validate_name(&name)?;
        debug!(profile = %name, engine = %kind, template = %template_name, "Profile resolved");

        Ok(ResolvedProfile {
            name,
            kind,
            request: RunRequest {
                content,
                template_name,
                prompt,
            },
            url,
            file_paths,
            additional_context,
            initial_actions,
            output_path: scraper.output_path,
        })
    }
}

/// Load and resolve the profile at `path`
pub fn load_profile(path: &Path) -> Result<ResolvedProfile> {
    let fallback = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| PROFILES_DIR_NAME.to_string());
    Profile::load(path)?.resolve(&fallback)
}

// The name becomes one directory level under the results root
fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || name.contains(|c| c == '/' || c == '\\') {
        return Err(CliError::Config(format!(
            "profile name '{}' must not contain path separators or be '.' or '..'",
            name
        )));
    }
    Ok(())
}

fn parse_prompt(value: &toml::Value) -> Result<TaskPrompt> {
    match value {
        toml::Value::String(text) => Ok(TaskPrompt::Text(text.clone())),
        toml::Value::Table(table) => {
            let tabular = TabularPrompt::from_lookup(|key| table.get(key).and_then(scalar_text))?;
            Ok(TaskPrompt::Tabular(tabular))
        }
        other => Err(CliError::Config(format!(
            "scraper.prompt must be a string or a table, found {}",
            other.type_str()
        ))),
    }
}

fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn resolve_template_name(requested: Option<&str>, kind: ScraperKind) -> String {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        None => kind.default_template().to_string(),
        Some(name) if find_template(name).is_some() => name.to_string(),
        Some(name) => {
            warn!(requested = name, "Unknown task template, using '{}'", DEFAULT_TEMPLATE);
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

fn context_text(section: ContextSection) -> Option<String> {
    if section.value.trim().is_empty() {
        return None;
    }
    match section.format {
        ContextFormat::Text => Some(section.value),
        ContextFormat::Json => match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&section.value) {
            Ok(object) => Some(
                object
                    .iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(s) => format!("{}: {}", key, s),
                        other => format!("{}: {}", key, other),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(e) => {
                warn!(error = %e, "scraper.context is not a JSON object, using it as text");
                Some(section.value)
            }
        },
    }
}

fn parse_initial_actions(tables: &[toml::Table]) -> Vec<InitialAction> {
    let mut actions = Vec::new();
    for table in tables {
        for (name, argument) in table {
            let parsed = scalar_text(argument).and_then(|arg| InitialAction::parse(name, &arg));
            match parsed {
                Some(action) => actions.push(action),
                None => warn!(action = %name, "Skipping unknown initial action"),
            }
        }
    }
    actions
}
