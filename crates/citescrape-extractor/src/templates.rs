//! Task templates and the task renderer
//!
//! The catalog is static. Plain templates substitute the prompt text into
//! `{prompt}`; the tabular template takes a structured prompt and turns its
//! pagination and filter settings into instruction lines first.

use crate::error::ExtractorError;
use citescrape_domain::{PageLimit, TabularPrompt, Task, TaskPrompt};
use serde_json::{json, Value};
use tracing::warn;

/// Template used when none is named or the named one is unknown
pub const DEFAULT_TEMPLATE: &str = "default";

/// Default template for PDF runs
pub const PDF_DEFAULT_TEMPLATE: &str = "pdf_default";

/// Name of the structured table template
pub const TABULAR_TEMPLATE: &str = "tabular_extraction";

/// Shape of the prompt a template is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A plain string in `{prompt}`
    Text,
    /// A [`TabularPrompt`]
    Tabular,
}

impl PayloadKind {
    /// Short label for listings
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Tabular => "tabular",
        }
    }
}

/// One named entry of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    /// Catalog name
    pub name: &'static str,
    /// Prompt payload the template expects
    pub payload: PayloadKind,
    /// Whether records should carry citations
    pub requests_citations: bool,
    /// One-line description for listings
    pub description: &'static str,
    /// Instruction text with `{placeholder}` slots
    pub format: &'static str,
}

const CITATION_RULES: &str = r#"For each piece of information, provide a citation with the exact text and where it appears on the page.
Provide a location_url that points to the specific part of the page where the information was found:
    - Select a short passage (a phrase, sentence or part of the answer itself) that contains the information.
    - Append '#:~:text=' and the URL-encoded passage to the page URL.
    - Example: for the passage "This is a sample text" the URL might be
      https://example.com/page#:~:text=This%20is%20a%20sample%20text"#;

/// Every template, in listing order
pub const TEMPLATES: &[TaskTemplate] = &[
    TaskTemplate {
        name: DEFAULT_TEMPLATE,
        payload: PayloadKind::Text,
        requests_citations: true,
        description: "Factual extraction with citations",
        format: r#"From the provided webpage, extract information about: "{prompt}"

Requirements:
1. The extracted information must be 100% factual and found on the page (DO NOT infer data).
2. {citation_rules}
3. Only include information that is relevant to the prompt."#,
    },
    TaskTemplate {
        name: "summary",
        payload: PayloadKind::Text,
        requests_citations: false,
        description: "Concise summary of the page",
        format: r#"Read the provided webpage and write a concise summary focused on: "{prompt}"

Requirements:
1. Only summarise what is stated on the page; do not add outside knowledge.
2. Put the key facts in the content list and a one-paragraph overview in the summary field.
3. Keep each extracted item short and self-contained."#,
    },
    TaskTemplate {
        name: "detailed",
        payload: PayloadKind::Text,
        requests_citations: true,
        description: "Exhaustive extraction with citations",
        format: r#"From the provided webpage, extract every detail related to: "{prompt}"

Requirements:
1. Be exhaustive: visit every relevant section of the page, including expandable or collapsed content.
2. The extracted information must be 100% factual and found on the page (DO NOT infer data).
3. {citation_rules}
4. Preserve numbers, dates and names exactly as written."#,
    },
    TaskTemplate {
        name: "qa",
        payload: PayloadKind::Text,
        requests_citations: true,
        description: "Answer a question from the page with citations",
        format: r#"Answer the following question using only the provided webpage: "{prompt}"

Requirements:
1. If the page does not contain the answer, return an empty content list and say so in the summary.
2. {citation_rules}
3. Quote the supporting passage exactly in source_text."#,
    },
    TaskTemplate {
        name: TABULAR_TEMPLATE,
        payload: PayloadKind::Tabular,
        requests_citations: false,
        description: "Table rows from a listing, with pagination and filters",
        format: r#"Extract structured data from {website} about {data_category}.

1. Navigate to {url}
2. Identify the table or structured data containing information about {data_points}
3. Extract all rows and columns while preserving the relationship between data points
{no_pages}
{filters}

Format the extracted data as JSON following the output format. If any data points are missing, mark them as "N/A" rather than leaving them blank."#,
    },
    TaskTemplate {
        name: PDF_DEFAULT_TEMPLATE,
        payload: PayloadKind::Text,
        requests_citations: false,
        description: "Extraction from PDF and text documents",
        format: r#"From the provided document excerpts, extract information about: "{prompt}"

Requirements:
1. The extracted information must be 100% factual and found in the documents (DO NOT infer data).
2. Mention the document and page or section each value came from in the summary when it is known.
3. Only include information that is relevant to the prompt."#,
    },
];

/// Look up a template by exact name
pub fn find_template(name: &str) -> Option<&'static TaskTemplate> {
    TEMPLATES.iter().find(|t| t.name == name)
}

/// Names of every template in the catalog
pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.name).collect()
}

/// Outcome of resolving a template name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTemplate {
    /// The template to render
    pub template: &'static TaskTemplate,
    /// True when the requested name was unknown and `default` was used
    pub fell_back: bool,
}

/// Resolve a template name, falling back to `default` with a warning
pub fn resolve_template(name: &str) -> ResolvedTemplate {
    match find_template(name) {
        Some(template) => ResolvedTemplate {
            template,
            fell_back: false,
        },
        None => {
            warn!(
                requested = name,
                available = ?template_names(),
                "Unknown task template, using '{}'",
                DEFAULT_TEMPLATE
            );
            ResolvedTemplate {
                template: &TEMPLATES[0],
                fell_back: true,
            }
        }
    }
}

/// Render a task from a template name and prompt
///
/// An unknown name renders the `default` template (logged, not an error).
/// A plain-string prompt for the tabular template is a configuration error.
///
/// # Examples
///
/// ```
/// use citescrape_extractor::render_task;
///
/// let task = render_task("default", &"film titles".into()).unwrap();
/// assert_eq!(task.template_name(), "default");
/// assert!(task.text().contains("\"film titles\""));
/// ```
pub fn render_task(template_name: &str, prompt: &TaskPrompt) -> Result<Task, ExtractorError> {
    let template = resolve_template(template_name).template;

    let text = match (template.payload, prompt) {
        (PayloadKind::Text, TaskPrompt::Text(text)) => render_text(template, text),
        (PayloadKind::Text, TaskPrompt::Tabular(tabular)) => {
            render_text(template, &tabular_as_json(tabular).to_string())
        }
        (PayloadKind::Tabular, TaskPrompt::Tabular(tabular)) => render_tabular(template, tabular),
        (PayloadKind::Tabular, TaskPrompt::Text(_)) => {
            return Err(ExtractorError::Config(format!(
                "template '{}' requires a structured prompt with keys: \
                 website, data_category, data_points, no_pages, filters, url",
                template.name
            )))
        }
    };

    Ok(Task::new(text, template.name))
}

/// Prompt text as stored in the result envelope
pub fn prompt_text(prompt: &TaskPrompt) -> String {
    match prompt {
        TaskPrompt::Text(text) => text.clone(),
        TaskPrompt::Tabular(tabular) => tabular_as_json(tabular).to_string(),
    }
}

fn render_text(template: &TaskTemplate, prompt: &str) -> String {
    fill_slots(
        template.format,
        &[("citation_rules", CITATION_RULES), ("prompt", prompt)],
    )
}

fn render_tabular(template: &TaskTemplate, prompt: &TabularPrompt) -> String {
    let no_pages = pagination_instruction(prompt.no_pages);
    let filters = filter_instruction(prompt.filters.as_deref());
    fill_slots(
        template.format,
        &[
            ("website", prompt.website.as_str()),
            ("data_category", prompt.data_category.as_str()),
            ("data_points", prompt.data_points.as_str()),
            ("no_pages", no_pages.as_str()),
            ("filters", filters.as_str()),
            ("url", prompt.url.as_str()),
        ],
    )
}

/// Fill `{name}` slots in one pass over `format`
///
/// Substituted values are never scanned again, and braces that do not name
/// a slot are kept as they are.
fn fill_slots(format: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let filled = after.find('}').and_then(|close| {
            let name = &after[..close];
            slots
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| (close, *value))
        });
        match filled {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn pagination_instruction(limit: PageLimit) -> String {
    match limit {
        PageLimit::All => {
            "4. If pagination exists, navigate through all pages and extract all data".to_string()
        }
        PageLimit::Count(n) => format!(
            "4. If pagination exists, navigate through at least the first {} pages and extract all data",
            n
        ),
        PageLimit::Unspecified => "4. There should be no pagination".to_string(),
    }
}

fn filter_instruction(filters: Option<&str>) -> String {
    match filters {
        Some(filters) => format!("5. If filters are available, apply {} before extraction", filters),
        None => String::new(),
    }
}

fn tabular_as_json(prompt: &TabularPrompt) -> Value {
    let no_pages = match prompt.no_pages {
        PageLimit::All => Value::from("all"),
        PageLimit::Count(n) => Value::from(n),
        PageLimit::Unspecified => Value::Null,
    };
    json!({
        "website": prompt.website,
        "data_category": prompt.data_category,
        "data_points": prompt.data_points,
        "no_pages": no_pages,
        "filters": prompt.filters,
        "url": prompt.url,
    })
}
