//! Task module - prompts and the rendered instruction sent to an engine

use crate::error::DomainError;
use std::fmt;

/// How many result pages a tabular extraction should walk through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// Every page until pagination runs out
    All,

    /// At least the first `n` pages
    Count(u32),

    /// No pagination expected
    Unspecified,
}

impl PageLimit {
    /// Parse the configuration form: `"all"`, a number, or nothing
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("all") => PageLimit::All,
            Some(v) => v.parse().map(PageLimit::Count).unwrap_or(PageLimit::Unspecified),
            None => PageLimit::Unspecified,
        }
    }
}

/// Structured payload for the `tabular_extraction` template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularPrompt {
    /// Human name of the website (e.g. "IMDB")
    pub website: String,

    /// What kind of rows are being collected (e.g. "films")
    pub data_category: String,

    /// Comma separated columns of interest
    pub data_points: String,

    /// Pagination depth
    pub no_pages: PageLimit,

    /// Filters to apply on the page before extracting, if any
    pub filters: Option<String>,

    /// Page to start from
    pub url: String,
}

impl TabularPrompt {
    /// Build a tabular prompt from looked-up keys
    ///
    /// `lookup` returns the string value of a key, if present. All keys except
    /// `no_pages` and `filters` are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(DomainError::MissingPromptKey(key));

        Ok(Self {
            website: required("website")?,
            data_category: required("data_category")?,
            data_points: required("data_points")?,
            no_pages: PageLimit::parse(lookup("no_pages").as_deref()),
            filters: lookup("filters").filter(|f| !f.trim().is_empty()),
            url: required("url")?,
        })
    }
}

/// The payload a task template is rendered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPrompt {
    /// A free-form natural language request
    Text(String),

    /// A structured request for table-shaped data
    Tabular(TabularPrompt),
}

impl TaskPrompt {
    /// The plain text of a [`TaskPrompt::Text`] prompt
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TaskPrompt::Text(text) => Some(text),
            TaskPrompt::Tabular(_) => None,
        }
    }

    /// Whether the prompt carries any content
    pub fn is_empty(&self) -> bool {
        match self {
            TaskPrompt::Text(text) => text.trim().is_empty(),
            TaskPrompt::Tabular(_) => false,
        }
    }
}

impl From<&str> for TaskPrompt {
    fn from(text: &str) -> Self {
        TaskPrompt::Text(text.to_string())
    }
}

impl From<String> for TaskPrompt {
    fn from(text: String) -> Self {
        TaskPrompt::Text(text)
    }
}

impl fmt::Display for TaskPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPrompt::Text(text) => write!(f, "{}", text),
            TaskPrompt::Tabular(t) => write!(
                f,
                "{} from {} ({}) at {}",
                t.data_points, t.website, t.data_category, t.url
            ),
        }
    }
}

/// A rendered instruction ready to hand to an extraction engine
///
/// Immutable once built; rendering again produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    task: String,
    template_name: String,
}

impl Task {
    /// Create a task from rendered text and the template it came from
    pub fn new(task: impl Into<String>, template_name: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            template_name: template_name.into(),
        }
    }

    /// The full instruction text
    pub fn text(&self) -> &str {
        &self.task
    }

    /// Name of the template that produced this task
    pub fn template_name(&self) -> &str {
        &self.template_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_page_limit_parsing() {
        assert_eq!(PageLimit::parse(Some("all")), PageLimit::All);
        assert_eq!(PageLimit::parse(Some("ALL")), PageLimit::All);
        assert_eq!(PageLimit::parse(Some("3")), PageLimit::Count(3));
        assert_eq!(PageLimit::parse(Some("many")), PageLimit::Unspecified);
        assert_eq!(PageLimit::parse(None), PageLimit::Unspecified);
    }

    #[test]
    fn test_tabular_prompt_from_lookup() {
        let prompt = TabularPrompt::from_lookup(lookup_from(&[
            ("website", "IMDB"),
            ("data_category", "films"),
            ("data_points", "title,rating"),
            ("no_pages", "all"),
            ("url", "https://imdb.com"),
        ]))
        .unwrap();

        assert_eq!(prompt.website, "IMDB");
        assert_eq!(prompt.no_pages, PageLimit::All);
        assert_eq!(prompt.filters, None);
    }

    #[test]
    fn test_tabular_prompt_missing_key() {
        let err = TabularPrompt::from_lookup(lookup_from(&[
            ("website", "IMDB"),
            ("data_category", "films"),
            ("data_points", "title"),
        ]))
        .unwrap_err();
        assert_eq!(err, DomainError::MissingPromptKey("url"));
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let prompt = TabularPrompt::from_lookup(lookup_from(&[
            ("website", "IMDB"),
            ("data_category", "films"),
            ("data_points", "title"),
            ("filters", "  "),
            ("url", "https://imdb.com"),
        ]))
        .unwrap();
        assert_eq!(prompt.filters, None);
    }

    #[test]
    fn test_task_accessors() {
        let task = Task::new("Extract things", "default");
        assert_eq!(task.text(), "Extract things");
        assert_eq!(task.template_name(), "default");
    }
}
