//! Result envelope assembly and persistence

use crate::error::ExtractorError;
use crate::output_model::{OutputList, DEFAULT_FORMAT_TYPE};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// File the envelope is written to inside the results directory
pub const OUTPUT_FILE_NAME: &str = "output.json";

/// The final result of a run
///
/// Two shapes exist and they do not share keys:
///
/// - success: `{"outputs": [...], "task_template", "prompt"}`
/// - empty: `{"content": "", "format_type": "text", "prompt", "url", "summary": "", "task_template"}`
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEnvelope {
    fields: Map<String, Value>,
    empty: bool,
}

/// Merge a coerced result with run metadata
///
/// `None` means the engine produced nothing and yields the fixed empty shape.
pub fn assemble(
    parsed: Option<&OutputList>,
    prompt: &str,
    template_name: &str,
    url: Option<&str>,
) -> ResultEnvelope {
    let mut fields = Map::new();
    match parsed {
        Some(parsed) => {
            if let Value::Object(outputs) = parsed.to_json() {
                fields.extend(outputs);
            }
            fields.insert("task_template".into(), template_name.into());
            fields.insert("prompt".into(), prompt.into());
        }
        None => {
            fields.insert("content".into(), "".into());
            fields.insert("format_type".into(), DEFAULT_FORMAT_TYPE.into());
            fields.insert("prompt".into(), prompt.into());
            fields.insert("url".into(), url.unwrap_or_default().into());
            fields.insert("summary".into(), "".into());
            fields.insert("task_template".into(), template_name.into());
        }
    }

    ResultEnvelope {
        fields,
        empty: parsed.is_none(),
    }
}

impl ResultEnvelope {
    /// True for the empty shape
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The envelope as a JSON map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The envelope as a JSON value
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Indented JSON text
    pub fn to_json_pretty(&self) -> Result<String, ExtractorError> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// Write the envelope to `<results_dir>/output.json`
    ///
    /// Without a results directory nothing is written and `Ok(None)` is
    /// returned.
    pub fn persist(&self, results_dir: Option<&Path>) -> Result<Option<PathBuf>, ExtractorError> {
        let Some(dir) = results_dir else {
            error!("No results directory configured, result not saved");
            return Ok(None);
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(OUTPUT_FILE_NAME);
        std::fs::write(&path, self.to_json_pretty()?)?;
        info!(path = %path.display(), "Results saved");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_model::build_output_model;
    use citescrape_domain::ContentFieldSpec;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let schema = build_output_model(&ContentFieldSpec::text_default());
        let parsed = schema
            .validate(&json!({"outputs": [{"TextContent-content": [{"text": "hi"}]}]}))
            .unwrap();

        let envelope = assemble(Some(&parsed), "greetings", "default", Some("https://x.io"));
        assert!(!envelope.is_empty());
        assert_eq!(
            envelope.to_json(),
            json!({
                "outputs": [{
                    "TextContent-content": [{"text": "hi"}],
                    "format_type": "text",
                    "summary": null
                }],
                "task_template": "default",
                "prompt": "greetings"
            })
        );
    }

    #[test]
    fn test_empty_shape_key_order() {
        let envelope = assemble(None, "p", "qa", None);
        let keys: Vec<&str> = envelope.as_map().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["content", "format_type", "prompt", "url", "summary", "task_template"]
        );
        assert_eq!(envelope.as_map()["url"], "");
    }

    #[test]
    fn test_persist_writes_output_json() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("profile").join("abc123");

        let envelope = assemble(None, "p", "default", Some("https://x.io"));
        let path = envelope.persist(Some(&results)).unwrap().unwrap();

        assert_eq!(path, results.join(OUTPUT_FILE_NAME));
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, envelope.to_json());
    }

    #[test]
    fn test_persist_without_directory_is_skipped() {
        let envelope = assemble(None, "p", "default", None);
        assert_eq!(envelope.persist(None).unwrap(), None);
    }
}
