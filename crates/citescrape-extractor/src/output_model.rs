//! Output-model factory
//!
//! Wraps a [`ContentModel`] in the two envelope levels every engine answer is
//! validated against:
//!
//! ```text
//! { "outputs": [ { "<Model>-content": [record, ...],
//!                  "format_type": "text",
//!                  "summary": null } ] }
//! ```

use crate::error::{CoercionError, ExtractorError};
use crate::schema::{build_content_model, mismatch, missing, ContentModel, ContentRecord};
use citescrape_domain::ContentFieldSpec;
use serde_json::{json, Map, Value};

/// Root key of an output list
pub const OUTPUTS_KEY: &str = "outputs";

/// Key holding the format of an output
pub const FORMAT_TYPE_KEY: &str = "format_type";

/// Key holding the optional summary of an output
pub const SUMMARY_KEY: &str = "summary";

/// Format used when an output does not state one
pub const DEFAULT_FORMAT_TYPE: &str = "text";

/// The root schema: `{ outputs: [OutputModel] }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputModelList {
    content: ContentModel,
    content_key: String,
}

/// Build the output schema for a content spec
///
/// Never cached; each run builds its own.
pub fn build_output_model(spec: &ContentFieldSpec) -> OutputModelList {
    OutputModelList::new(build_content_model(spec))
}

impl OutputModelList {
    /// Wrap an existing content model
    pub fn new(content: ContentModel) -> Self {
        let content_key = content.spec().content_key();
        Self {
            content,
            content_key,
        }
    }

    /// Same schema with citations on every content record
    pub fn with_citations(self) -> Result<Self, ExtractorError> {
        Ok(Self::new(self.content.with_citations()?))
    }

    /// The per-record model
    pub fn content_model(&self) -> &ContentModel {
        &self.content
    }

    /// Key of the content list inside each output: `<Model>-content`
    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    /// Validate a parsed JSON document against the full schema
    ///
    /// All or nothing: one bad record fails the whole document.
    pub fn validate(&self, value: &Value) -> Result<OutputList, CoercionError> {
        let root = value
            .as_object()
            .ok_or_else(|| mismatch("$", "object with an 'outputs' list", value))?;
        let outputs = match root.get(OUTPUTS_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(mismatch(OUTPUTS_KEY, "list", other)),
            None => return Err(missing(OUTPUTS_KEY, "list")),
        };

        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(idx, output)| self.validate_output(output, &format!("{}[{}]", OUTPUTS_KEY, idx)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OutputList {
            content_key: self.content_key.clone(),
            outputs,
        })
    }

    fn validate_output(&self, value: &Value, path: &str) -> Result<OutputRecord, CoercionError> {
        let object = value
            .as_object()
            .ok_or_else(|| mismatch(path, format!("{} output object", self.content.name()), value))?;

        let content_path = format!("{}.{}", path, self.content_key);
        let records = match object.get(&self.content_key) {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(mismatch(&content_path, "list", other)),
            None => return Err(missing(&content_path, "list")),
        };
        let content = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                self.content
                    .validate_record(record, &format!("{}[{}]", content_path, idx))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let format_type = match object.get(FORMAT_TYPE_KEY) {
            None => DEFAULT_FORMAT_TYPE.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(mismatch(&format!("{}.{}", path, FORMAT_TYPE_KEY), "string", other))
            }
        };

        let summary = match object.get(SUMMARY_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(mismatch(
                    &format!("{}.{}", path, SUMMARY_KEY),
                    "string or null",
                    other,
                ))
            }
        };

        Ok(OutputRecord {
            content,
            format_type,
            summary,
        })
    }

    /// Whether a bare JSON object looks like one output rather than one record
    pub(crate) fn is_output_shaped(&self, object: &Map<String, Value>) -> bool {
        object.contains_key(&self.content_key)
    }

    /// Whether a bare JSON object looks like a single content record
    pub(crate) fn is_record_shaped(&self, object: &Map<String, Value>) -> bool {
        self.content.shares_fields_with(object)
    }

    /// JSON Schema for the whole document, embedded in engine prompts
    pub fn json_schema(&self) -> Value {
        let name = self.content.name();
        json!({
            "title": format!("{}OutputList", name),
            "type": "object",
            "required": [OUTPUTS_KEY],
            "properties": {
                OUTPUTS_KEY: {
                    "type": "array",
                    "items": {
                        "title": format!("{}Output", name),
                        "type": "object",
                        "required": [self.content_key.as_str()],
                        "properties": {
                            self.content_key.as_str(): {
                                "type": "array",
                                "description": "Extracted information in the most appropriate format",
                                "items": self.content.json_schema(),
                            },
                            FORMAT_TYPE_KEY: {
                                "type": "string",
                                "default": DEFAULT_FORMAT_TYPE,
                                "description": "Format type of the content (json/table/text/etc.)",
                            },
                            SUMMARY_KEY: {
                                "type": ["string", "null"],
                                "description": "Brief summary of the information found",
                            },
                        }
                    }
                }
            }
        })
    }

    /// Pretty JSON Schema text
    pub fn json_schema_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.json_schema()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One validated output: a content list plus format and summary
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Extracted records
    pub content: Vec<ContentRecord>,
    /// Format of the content (`json`, `table`, `text`, ...)
    pub format_type: String,
    /// Optional summary
    pub summary: Option<String>,
}

/// A validated instance of [`OutputModelList`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutputList {
    content_key: String,
    outputs: Vec<OutputRecord>,
}

impl OutputList {
    /// Validated outputs in response order
    pub fn outputs(&self) -> &[OutputRecord] {
        &self.outputs
    }

    /// Key the content list is stored under
    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    /// Every record across all outputs
    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.outputs.iter().flat_map(|o| o.content.iter())
    }

    /// Plain JSON form, `{"outputs": [...]}`
    pub fn to_json(&self) -> Value {
        let outputs = self
            .outputs
            .iter()
            .map(|output| {
                let mut object = Map::new();
                object.insert(
                    self.content_key.clone(),
                    Value::Array(output.content.iter().map(ContentRecord::to_json).collect()),
                );
                object.insert(
                    FORMAT_TYPE_KEY.to_string(),
                    Value::String(output.format_type.clone()),
                );
                object.insert(
                    SUMMARY_KEY.to_string(),
                    output.summary.clone().map(Value::String).unwrap_or(Value::Null),
                );
                Value::Object(object)
            })
            .collect();
        json!({ OUTPUTS_KEY: Value::Array(outputs) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;

    fn film_schema() -> OutputModelList {
        let spec = ContentFieldSpec::new(
            "Film_Info",
            vec![("title", "str"), ("year", "int")],
        )
        .unwrap();
        build_output_model(&spec)
    }

    #[test]
    fn test_content_key_embeds_model_name() {
        assert_eq!(film_schema().content_key(), "Film_Info-content");
    }

    #[test]
    fn test_defaults_for_format_and_summary() {
        let parsed = film_schema()
            .validate(&json!({"outputs": [{"Film_Info-content": []}]}))
            .unwrap();
        assert_eq!(parsed.outputs()[0].format_type, "text");
        assert_eq!(parsed.outputs()[0].summary, None);
    }

    #[test]
    fn test_null_format_type_is_rejected() {
        let err = film_schema()
            .validate(&json!({"outputs": [{"Film_Info-content": [], "format_type": null}]}))
            .unwrap_err();
        assert_eq!(err.path(), Some("outputs[0].format_type"));
    }

    #[test]
    fn test_missing_content_key() {
        let err = film_schema()
            .validate(&json!({"outputs": [{"content": []}]}))
            .unwrap_err();
        assert_eq!(err.path(), Some("outputs[0].Film_Info-content"));
    }

    #[test]
    fn test_one_bad_record_fails_the_batch() {
        let err = film_schema()
            .validate(&json!({"outputs": [{"Film_Info-content": [
                {"title": "A", "year": 2000},
                {"title": "B", "year": "2001"}
            ]}]}))
            .unwrap_err();
        assert_eq!(err.path(), Some("outputs[0].Film_Info-content[1].year"));
    }

    #[test]
    fn test_empty_outputs_list_is_valid() {
        let parsed = film_schema().validate(&json!({"outputs": []})).unwrap();
        assert!(parsed.outputs().is_empty());
        assert_eq!(parsed.to_json(), json!({"outputs": []}));
    }

    #[test]
    fn test_records_iterates_all_outputs() {
        let parsed = film_schema()
            .validate(&json!({"outputs": [
                {"Film_Info-content": [{"title": "A"}]},
                {"Film_Info-content": [{"title": "B"}, {"title": "C"}]}
            ]}))
            .unwrap();
        let titles: Vec<_> = parsed
            .records()
            .filter_map(|r| r.get("title").map(FieldValue::display))
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = film_schema().json_schema();
        assert_eq!(schema["title"], "Film_InfoOutputList");
        let output = &schema["properties"]["outputs"]["items"];
        assert_eq!(output["required"], json!(["Film_Info-content"]));
        assert_eq!(
            output["properties"]["Film_Info-content"]["items"]["title"],
            "Film_Info"
        );
        assert_eq!(output["properties"]["format_type"]["default"], "text");
    }

    #[test]
    fn test_with_citations_extends_record_schema() {
        let schema = film_schema().with_citations().unwrap();
        assert!(schema.content_model().has_citations());
        assert!(schema.json_schema()["properties"]["outputs"]["items"]["properties"]
            ["Film_Info-content"]["items"]["properties"]
            .get("citations")
            .is_some());
    }
}
