//! Field module - the closed set of primitive types a content field may hold

use std::fmt;

/// Primitive type of a declared content field
///
/// Every content field maps to exactly one of these tags. The set is closed:
/// configuration naming any other type is rejected before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 text
    String,

    /// Signed 64-bit integer
    Int,

    /// 64-bit floating point number
    Float,

    /// true / false
    Bool,
}

impl FieldType {
    /// All recognised field types, in declaration order
    pub const ALL: [FieldType; 4] = [
        FieldType::String,
        FieldType::Int,
        FieldType::Float,
        FieldType::Bool,
    ];

    /// The configuration tag for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "str",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }

    /// Human readable name used in validation messages
    pub fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "integer",
            FieldType::Float => "number",
            FieldType::Bool => "boolean",
        }
    }

    /// JSON Schema `type` keyword for this field
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "integer",
            FieldType::Float => "number",
            FieldType::Bool => "boolean",
        }
    }

    /// Parse a type tag from configuration
    ///
    /// Accepts the short tags (`str`, `int`, `float`, `bool`) as well as their
    /// long spellings. Matching is case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use citescrape_domain::FieldType;
    ///
    /// assert_eq!(FieldType::parse("int"), Some(FieldType::Int));
    /// assert_eq!(FieldType::parse("Boolean"), Some(FieldType::Bool));
    /// assert_eq!(FieldType::parse("date"), None);
    /// ```
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "str" | "string" => Some(FieldType::String),
            "int" | "integer" => Some(FieldType::Int),
            "float" | "number" => Some(FieldType::Float),
            "bool" | "boolean" => Some(FieldType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_tags() {
        assert_eq!(FieldType::parse("str"), Some(FieldType::String));
        assert_eq!(FieldType::parse("int"), Some(FieldType::Int));
        assert_eq!(FieldType::parse("float"), Some(FieldType::Float));
        assert_eq!(FieldType::parse("bool"), Some(FieldType::Bool));
    }

    #[test]
    fn test_parse_long_tags_case_insensitive() {
        assert_eq!(FieldType::parse("STRING"), Some(FieldType::String));
        assert_eq!(FieldType::parse("Integer"), Some(FieldType::Int));
        assert_eq!(FieldType::parse(" boolean "), Some(FieldType::Bool));
    }

    #[test]
    fn test_parse_unknown_tag() {
        assert_eq!(FieldType::parse("list"), None);
        assert_eq!(FieldType::parse(""), None);
    }

    #[test]
    fn test_round_trip_through_tag() {
        for field_type in FieldType::ALL {
            assert_eq!(FieldType::parse(field_type.as_str()), Some(field_type));
        }
    }
}
