//! Content specification - the declared shape of one extracted record

use crate::error::DomainError;
use crate::field::FieldType;
use std::collections::HashSet;

/// Model name used when no content structure is configured
pub const DEFAULT_MODEL_NAME: &str = "TextContent";

/// Field names that would collide with keys of the output envelope
pub const RESERVED_FIELD_NAMES: [&str; 3] = ["outputs", "format_type", "summary"];

/// One declared field of a content record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as it appears in extracted records
    pub name: String,

    /// Primitive type of the field
    pub field_type: FieldType,
}

/// A validated content specification: a model name and its ordered fields
///
/// Built once per run from configuration and never mutated afterwards.
/// Construction enforces the invariants every later stage relies on:
/// unique names, recognised type tags, no collision with envelope keys.
///
/// # Examples
///
/// ```
/// use citescrape_domain::{ContentFieldSpec, FieldType};
///
/// let spec = ContentFieldSpec::new(
///     "Film_Info",
///     vec![("title", "str"), ("year", "int")],
/// ).unwrap();
///
/// assert_eq!(spec.content_key(), "Film_Info-content");
/// assert_eq!(spec.field("year").unwrap().field_type, FieldType::Int);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFieldSpec {
    model_name: String,
    fields: Vec<FieldDef>,
}

impl ContentFieldSpec {
    /// Build a spec from a model name and `(field name, type tag)` pairs
    pub fn new<I, N, T>(model_name: impl Into<String>, fields: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        let typed = fields
            .into_iter()
            .map(|(name, tag)| {
                let name = name.into();
                match FieldType::parse(tag.as_ref()) {
                    Some(field_type) => Ok((name, field_type)),
                    None => Err(DomainError::UnknownFieldType {
                        field: name,
                        tag: tag.as_ref().to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_typed(model_name, typed)
    }

    /// Build a spec from already-typed fields
    pub fn from_typed(
        model_name: impl Into<String>,
        fields: Vec<(String, FieldType)>,
    ) -> Result<Self, DomainError> {
        let model_name = model_name.into();
        if model_name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }
        if fields.is_empty() {
            return Err(DomainError::InvalidDeclaration(format!(
                "model '{}' declares no fields",
                model_name
            )));
        }

        let mut seen = HashSet::new();
        let mut defs = Vec::with_capacity(fields.len());
        for (name, field_type) in fields {
            if name.trim().is_empty() {
                return Err(DomainError::EmptyName);
            }
            if RESERVED_FIELD_NAMES.contains(&name.as_str()) {
                return Err(DomainError::ReservedFieldName(name));
            }
            if !seen.insert(name.clone()) {
                return Err(DomainError::DuplicateField(name));
            }
            defs.push(FieldDef { name, field_type });
        }

        Ok(Self {
            model_name,
            fields: defs,
        })
    }

    /// Build a spec from the configuration shape `{ModelName: {field: tag}}`
    ///
    /// An empty declaration yields [`ContentFieldSpec::text_default`]. More
    /// than one model in the same declaration is rejected.
    pub fn from_declaration<I, F, N, T>(declaration: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (String, F)>,
        F: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        let mut models = declaration.into_iter();
        let Some((model_name, fields)) = models.next() else {
            return Ok(Self::text_default());
        };
        if let Some((extra, _)) = models.next() {
            return Err(DomainError::InvalidDeclaration(format!(
                "expected a single content model, found '{}' and '{}'",
                model_name, extra
            )));
        }
        Self::new(model_name, fields)
    }

    /// The fallback spec for unstructured extraction: `TextContent { text: str }`
    pub fn text_default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            fields: vec![FieldDef {
                name: "text".to_string(),
                field_type: FieldType::String,
            }],
        }
    }

    /// Name of the content model
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Key under which records of this model are listed in an output: `<model>-content`
    pub fn content_key(&self) -> String {
        format!("{}-content", self.model_name)
    }
}
