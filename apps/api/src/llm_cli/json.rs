//! JSON recovery from raw model output.
//!
//! The CLI is instructed to return bare JSON, but real output drifts:
//! markdown fences, leading commentary, trailing notes. The fallback
//! chain tries, in order: whole-text parse, fenced-block extraction,
//! brace-balanced scanning. First success wins.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// How much raw output to keep for diagnostics when recovery fails.
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
#[error("no valid JSON found in model output: {preview}")]
pub struct JsonRecoveryError {
    pub preview: String,
}

/// Matches object-shaped substrings with one level of brace nesting.
fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("object pattern compiles")
    })
}

/// Recovers a JSON object from raw model output.
/// Only objects satisfy the chain; arrays and scalars are rejected.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, JsonRecoveryError> {
    let trimmed = raw.trim();

    if let Some(map) = parse_object(trimmed) {
        return Ok(map);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Some(map) = parse_object(inner) {
            return Ok(map);
        }
    }

    for candidate in object_pattern().find_iter(trimmed) {
        if let Some(map) = parse_object(candidate.as_str()) {
            return Ok(map);
        }
    }

    Err(JsonRecoveryError {
        preview: trimmed.chars().take(PREVIEW_CHARS).collect(),
    })
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Returns the interior of a ```json fenced block, or of a bare fence
/// wrapping the whole text.
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        let end = rest.find("```")?;
        return Some(rest[..end].trim());
    }
    if let Some(stripped) = text.strip_prefix("```") {
        return Some(stripped.strip_suffix("```").unwrap_or(stripped).trim());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json_parses() {
        let map = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_fenced_json_parses() {
        let map = extract_json_object("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_bare_fence_parses() {
        let map = extract_json_object("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_fenced_json_with_surrounding_prose() {
        let raw = "Here is the result:\n```json\n{\"a\": 1}\n```\nLet me know if you need more.";
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_embedded_object_recovered_from_noise() {
        let map = extract_json_object("noise {\"a\":1} noise").unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_nested_object_recovered_from_noise() {
        let raw = r#"the model says {"skills": ["Rust"], "meta": {"count": 1}} done"#;
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map["skills"][0], "Rust");
        assert_eq!(map["meta"]["count"], 1);
    }

    #[test]
    fn test_array_is_rejected() {
        let err = extract_json_object(r#"[1, 2, 3]"#).unwrap_err();
        assert!(err.to_string().starts_with("no valid JSON found"));
    }

    #[test]
    fn test_garbage_fails_with_preview() {
        let err = extract_json_object("I could not process this CV, sorry.").unwrap_err();
        assert!(err.preview.contains("could not process"));
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = "x".repeat(1000);
        let err = extract_json_object(&long).unwrap_err();
        assert_eq!(err.preview.chars().count(), PREVIEW_CHARS);
    }
}
