//! Extraction of JSON fragments from free-form model text.
//!
//! Model responses that are asked for JSON routinely wrap it in prose or
//! markdown fences. [`extract_json`] isolates the first balanced
//! `[...]`/`{...}` span with a small scanner (string- and escape-aware, so
//! brackets inside string literals do not confuse it) and parses it into the
//! caller's type. Callers never touch the boundary detection directly, so
//! the scanner can be swapped without touching them.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Which JSON container to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// First balanced `[...]` span
    Array,
    /// First balanced `{...}` span
    Object,
}

/// Errors from JSON extraction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// No balanced span of the requested shape was found
    #[error("No JSON {0} found in response text")]
    NotFound(&'static str),

    /// A span was found but did not parse as the expected type
    #[error("Failed to parse extracted JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Find the first balanced `[...]` span in `text`.
pub fn extract_array(text: &str) -> Option<&str> {
    extract_span(text, b'[', b']')
}

/// Find the first balanced `{...}` span in `text`.
pub fn extract_object(text: &str) -> Option<&str> {
    extract_span(text, b'{', b'}')
}

/// Extract the first balanced span of the given shape and parse it.
///
/// # Example
///
/// ```
/// use promptcheck_core::extract::{extract_json, Shape};
///
/// let text = "Here you go:\n[1, 2, 3]\nEnjoy!";
/// let values: Vec<u32> = extract_json(text, Shape::Array).unwrap();
/// assert_eq!(values, vec![1, 2, 3]);
/// ```
pub fn extract_json<T: DeserializeOwned>(text: &str, shape: Shape) -> Result<T, ExtractError> {
    let span = match shape {
        Shape::Array => extract_array(text).ok_or(ExtractError::NotFound("array"))?,
        Shape::Object => extract_object(text).ok_or(ExtractError::NotFound("object"))?,
    };
    Ok(serde_json::from_str(span)?)
}

/// Scan for the first balanced `open`..`close` span, skipping bracket
/// characters that appear inside JSON string literals.
fn extract_span(text: &str, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == open)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case::bare("[1,2]", "[1,2]")]
    #[case::prose_around("sure, here: [1, 2] done", "[1, 2]")]
    #[case::nested("x [[1],[2]] y", "[[1],[2]]")]
    #[case::fenced("```json\n[\"a\"]\n```", "[\"a\"]")]
    fn test_extract_array(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(extract_array(text), Some(expected));
    }

    #[test]
    fn test_extract_array_absent() {
        assert_eq!(extract_array("no brackets here"), None);
        assert_eq!(extract_array("unbalanced ["), None);
    }

    #[test]
    fn test_extract_object_with_bracket_in_string() {
        let text = r#"answer: {"note": "a ] tricky } string", "n": 1} trailing"#;
        let span = extract_object(text).unwrap();
        let value: Value = serde_json::from_str(span).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_extract_object_with_escaped_quote() {
        let text = r#"{"quote": "she said \"hi\"", "ok": true}"#;
        let span = extract_object(text).unwrap();
        let value: Value = serde_json::from_str(span).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_extract_json_typed() {
        #[derive(serde::Deserialize)]
        struct Item {
            input: String,
        }

        let text = r#"Cases: [{"input": "2+2?"}, {"input": "3+3?"}]"#;
        let items: Vec<Item> = extract_json(text, Shape::Array).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].input, "2+2?");
    }

    #[test]
    fn test_extract_json_not_found() {
        let result: Result<Vec<Value>, _> = extract_json("plain prose", Shape::Array);
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    #[test]
    fn test_extract_json_parse_failure() {
        // Balanced but not valid JSON
        let result: Result<Vec<Value>, _> = extract_json("[1, 2,,]", Shape::Array);
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_object_before_array_ignored_for_array_shape() {
        let text = r#"{"meta": 1} then [2, 3]"#;
        assert_eq!(extract_array(text), Some("[2, 3]"));
    }
}
