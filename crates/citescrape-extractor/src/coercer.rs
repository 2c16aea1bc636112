//! Response coercer: untrusted engine text to a validated [`OutputList`]

use crate::error::CoercionError;
use crate::output_model::{OutputList, OutputModelList, OUTPUTS_KEY};
use serde_json::{json, Value};
use tracing::debug;

/// Coerce raw engine text into the output schema
///
/// Two attempts, in order:
///
/// 1. Parse and validate the text as the full `{"outputs": [...]}` document.
/// 2. If that fails and the text is a single JSON object, wrap it and
///    validate again. An object holding the `<Model>-content` key is taken
///    as one output; an object holding declared fields is taken as one
///    record.
///
/// When both fail, the error from the first attempt is returned. Callers
/// must not pass empty text; an engine that produced nothing takes the
/// empty-envelope path instead.
///
/// Fences are not stripped here; engines that need it call
/// [`strip_code_fences`] first.
pub fn coerce(raw_text: &str, schema: &OutputModelList) -> Result<OutputList, CoercionError> {
    let value: Value =
        serde_json::from_str(raw_text).map_err(|e| CoercionError::Syntax(e.to_string()))?;

    let direct_error = match schema.validate(&value) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    let Some(wrapped) = wrap_single_object(value, schema) else {
        return Err(direct_error);
    };

    match schema.validate(&wrapped) {
        Ok(parsed) => {
            debug!(
                content_key = schema.content_key(),
                "Response was not enveloped; accepted after wrapping"
            );
            Ok(parsed)
        }
        Err(wrapped_error) => {
            debug!(%wrapped_error, "Wrapped retry also failed");
            Err(direct_error)
        }
    }
}

fn wrap_single_object(value: Value, schema: &OutputModelList) -> Option<Value> {
    let object = match &value {
        Value::Object(object) if !object.contains_key(OUTPUTS_KEY) => object,
        _ => return None,
    };

    if schema.is_output_shaped(object) {
        Some(json!({ OUTPUTS_KEY: [value] }))
    } else if schema.is_record_shaped(object) {
        Some(json!({ OUTPUTS_KEY: [{ schema.content_key(): [value] }] }))
    } else {
        Some(json!({ OUTPUTS_KEY: [value] }))
    }
}

/// Remove a surrounding markdown code fence (```` ```json ... ``` ````)
///
/// Text without a leading fence is returned trimmed and otherwise unchanged.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the info string (`json`, `JSON`, ...) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_model::build_output_model;
    use citescrape_domain::ContentFieldSpec;

    fn schema() -> OutputModelList {
        let spec = ContentFieldSpec::new("Item", vec![("name", "str"), ("count", "int")]).unwrap();
        build_output_model(&spec)
    }

    #[test]
    fn test_direct_document() {
        let parsed = coerce(
            r#"{"outputs":[{"Item-content":[{"name":"a","count":1}],"format_type":"json"}]}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(parsed.outputs()[0].format_type, "json");
    }

    #[test]
    fn test_single_output_is_wrapped() {
        let parsed = coerce(
            r#"{"Item-content":[{"name":"a"}],"summary":"one item"}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(parsed.outputs().len(), 1);
        assert_eq!(parsed.outputs()[0].summary.as_deref(), Some("one item"));
    }

    #[test]
    fn test_single_record_is_wrapped() {
        let parsed = coerce(r#"{"name":"a","count":3}"#, &schema()).unwrap();
        assert_eq!(parsed.outputs()[0].content.len(), 1);
        assert_eq!(parsed.outputs()[0].format_type, "text");
    }

    #[test]
    fn test_syntax_error() {
        let err = coerce("not json", &schema()).unwrap_err();
        assert!(matches!(err, CoercionError::Syntax(_)));
    }

    #[test]
    fn test_top_level_list_is_not_wrapped() {
        let err = coerce(r#"[{"name":"a"}]"#, &schema()).unwrap_err();
        assert_eq!(err.path(), Some("$"));
    }

    #[test]
    fn test_first_error_wins() {
        // Fails directly on the outputs envelope and again after wrapping
        let err = coerce(r#"{"name": 5}"#, &schema()).unwrap_err();
        assert_eq!(err.path(), Some("outputs"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}
