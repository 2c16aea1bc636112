//! Content-schema builder
//!
//! Turns a [`ContentFieldSpec`] into a [`ContentModel`]: a runtime record type
//! that validates one extracted record and describes itself as JSON Schema.
//! Every declared field is optional; absence and `null` both mean "not found".

use crate::error::{CoercionError, ExtractorError};
use citescrape_domain::{Citation, ContentFieldSpec, FieldDef, FieldType};
use serde_json::{json, Map, Value};

/// Name of the optional citation list added to records by citing templates
pub const CITATIONS_FIELD: &str = "citations";

/// A validated primitive value of a content field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    ///
    /// An integer given for a float field is widened, so `9` is written back
    /// as `9.0`. Round trips preserve floats, not the integer spelling.
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl FieldValue {
    /// Plain JSON form of the value
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Display form used by table output
    pub fn display(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

/// One validated content record
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    values: Vec<(String, Option<FieldValue>)>,
    citations: Option<Vec<Citation>>,
}

impl ContentRecord {
    /// Value of a field, `None` when the field was absent or null
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// All fields in declaration order
    pub fn values(&self) -> &[(String, Option<FieldValue>)] {
        &self.values
    }

    /// Citations attached to the record, when the schema asks for them
    pub fn citations(&self) -> Option<&[Citation]> {
        self.citations.as_deref()
    }

    /// JSON object with every declared field (absent ones as `null`)
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in &self.values {
            object.insert(
                name.clone(),
                value.as_ref().map(FieldValue::to_json).unwrap_or(Value::Null),
            );
        }
        if let Some(citations) = &self.citations {
            let list = citations
                .iter()
                .map(|c| {
                    json!({
                        "source_text": c.source_text,
                        "location": c.location,
                        "location_url": c.location_url,
                    })
                })
                .collect();
            object.insert(CITATIONS_FIELD.to_string(), Value::Array(list));
        }
        Value::Object(object)
    }
}

/// Runtime record type derived from a content spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentModel {
    spec: ContentFieldSpec,
    citations: bool,
}

/// Build the content model for a spec
///
/// Pure and deterministic: the same spec always yields an equal model.
pub fn build_content_model(spec: &ContentFieldSpec) -> ContentModel {
    ContentModel {
        spec: spec.clone(),
        citations: false,
    }
}

impl ContentModel {
    /// Add the optional `citations` list to every record
    ///
    /// Fails when the spec already declares a field called `citations`.
    pub fn with_citations(mut self) -> Result<Self, ExtractorError> {
        if self.spec.field(CITATIONS_FIELD).is_some() {
            return Err(ExtractorError::Config(format!(
                "field name '{}' is reserved by templates that request citations",
                CITATIONS_FIELD
            )));
        }
        self.citations = true;
        Ok(self)
    }

    /// Whether records carry citations
    pub fn has_citations(&self) -> bool {
        self.citations
    }

    /// Name of the model
    pub fn name(&self) -> &str {
        self.spec.model_name()
    }

    /// Declared fields in order
    pub fn fields(&self) -> &[FieldDef] {
        self.spec.fields()
    }

    /// The spec this model was built from
    pub fn spec(&self) -> &ContentFieldSpec {
        &self.spec
    }

    /// Whether `object` holds at least one declared field
    pub(crate) fn shares_fields_with(&self, object: &Map<String, Value>) -> bool {
        self.fields().iter().any(|f| object.contains_key(&f.name))
    }

    /// Validate one record at `path`
    pub fn validate_record(&self, value: &Value, path: &str) -> Result<ContentRecord, CoercionError> {
        let object = value
            .as_object()
            .ok_or_else(|| mismatch(path, format!("{} object", self.name()), value))?;

        let mut values = Vec::with_capacity(self.fields().len());
        for field in self.fields() {
            let field_path = format!("{}.{}", path, field.name);
            let parsed = match object.get(&field.name) {
                None | Some(Value::Null) => None,
                Some(raw) => Some(validate_field(field.field_type, raw, &field_path)?),
            };
            values.push((field.name.clone(), parsed));
        }

        let citations = if self.citations {
            let citations_path = format!("{}.{}", path, CITATIONS_FIELD);
            match object.get(CITATIONS_FIELD) {
                None | Some(Value::Null) => None,
                Some(raw) => Some(validate_citations(raw, &citations_path)?),
            }
        } else {
            None
        };

        Ok(ContentRecord { values, citations })
    }

    /// JSON Schema describing one record
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields() {
            properties.insert(
                field.name.clone(),
                json!({ "type": [field.field_type.json_schema_type(), "null"] }),
            );
        }
        if self.citations {
            properties.insert(
                CITATIONS_FIELD.to_string(),
                json!({
                    "type": "array",
                    "description": "Where each value was found",
                    "items": {
                        "type": "object",
                        "required": ["source_text", "location", "location_url"],
                        "properties": {
                            "source_text": {
                                "type": "string",
                                "description": "The exact text from the source where the data was found"
                            },
                            "location": {
                                "type": "string",
                                "description": "Description of where this was found"
                            },
                            "location_url": {
                                "type": "string",
                                "description": "URL of the location, highlighting the text with #:~:text="
                            }
                        }
                    }
                }),
            );
        }

        json!({
            "title": self.name(),
            "type": "object",
            "properties": Value::Object(properties),
        })
    }
}

fn validate_field(field_type: FieldType, value: &Value, path: &str) -> Result<FieldValue, CoercionError> {
    let expected = field_type.describe();
    match field_type {
        FieldType::String => value
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| mismatch(path, expected, value)),
        FieldType::Int => value
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| mismatch(path, expected, value)),
        FieldType::Float => value
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| mismatch(path, expected, value)),
        FieldType::Bool => value
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| mismatch(path, expected, value)),
    }
}

fn validate_citations(value: &Value, path: &str) -> Result<Vec<Citation>, CoercionError> {
    let items = value
        .as_array()
        .ok_or_else(|| mismatch(path, "list of citations", value))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let item_path = format!("{}[{}]", path, idx);
            let object = item
                .as_object()
                .ok_or_else(|| mismatch(&item_path, "citation object", item))?;
            let text = |key: &str| -> Result<String, CoercionError> {
                let key_path = format!("{}.{}", item_path, key);
                match object.get(key) {
                    Some(Value::String(s)) => Ok(s.clone()),
                    Some(other) => Err(mismatch(&key_path, "string", other)),
                    None => Err(missing(&key_path, "string")),
                }
            };
            Ok(Citation {
                source_text: text("source_text")?,
                location: text("location")?,
                location_url: text("location_url")?,
            })
        })
        .collect()
}

pub(crate) fn mismatch(path: &str, expected: impl Into<String>, found: &Value) -> CoercionError {
    CoercionError::Schema {
        path: path.to_string(),
        expected: expected.into(),
        found: describe(found),
    }
}

pub(crate) fn missing(path: &str, expected: impl Into<String>) -> CoercionError {
    CoercionError::Schema {
        path: path.to_string(),
        expected: expected.into(),
        found: "nothing (field is required)".to_string(),
    }
}

/// Short description of a JSON value for error messages
pub(crate) fn describe(value: &Value) -> String {
    const MAX_SHOWN: usize = 40;
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) if n.is_i64() || n.is_u64() => format!("integer {}", n),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) if s.chars().count() > MAX_SHOWN => {
            let shown: String = s.chars().take(MAX_SHOWN).collect();
            format!("string \"{}...\"", shown)
        }
        Value::String(s) => format!("string \"{}\"", s),
        Value::Array(items) => format!("list of {} items", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}
