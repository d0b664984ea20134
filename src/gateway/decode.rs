//! Decoding of generative output
//!
//! Models wrap JSON in Markdown fences or surround it with chatter. Decoding
//! is fallible and returns `AnalysisError::Decode`; callers decide what
//! default to substitute.

use serde::de::DeserializeOwned;

use crate::errors::{AnalysisError, Result};

/// Markdown code fence marker
const FENCE: &str = "```";

/// Return the body of the first fenced block, or the trimmed text when
/// there is no fence. A leading `json` language tag is dropped.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.contains(FENCE) {
        return trimmed;
    }

    let mut parts = trimmed.split(FENCE);
    parts.next();
    let block = match parts.next() {
        Some(block) => block.trim(),
        None => return trimmed,
    };

    block
        .strip_prefix("json")
        .or_else(|| block.strip_prefix("JSON"))
        .unwrap_or(block)
        .trim()
}

/// Locate the first balanced JSON object or array in `text`.
///
/// Single pass bracket matching; brackets inside string literals and
/// escaped quotes are ignored. Returns byte offsets `(start, end)` inclusive.
pub fn find_json_span(text: &str) -> Option<(usize, usize)> {
    let mut depth: i32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if start.is_none() {
            if ch == '{' || ch == '[' {
                start = Some(i);
                depth = 1;
            }
            continue;
        }

        if escape_next {
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| (s, i));
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode a value of type `T` from model output
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fence(text);

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let (start, end) = find_json_span(body).ok_or_else(|| {
                AnalysisError::Decode(format!("no JSON found in output: {}", direct_err))
            })?;
            serde_json::from_str(&body[start..=end])
                .map_err(|e| AnalysisError::Decode(format!("invalid JSON in output: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Here you go:\n```json\n{\"brand\": \"Lays\"}\n```\nEnjoy";
        assert_eq!(strip_code_fence(text), "{\"brand\": \"Lays\"}");
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let text = "```\n[{\"a\": 1}]\n```";
        assert_eq!(strip_code_fence(text), "[{\"a\": 1}]");
    }

    #[test]
    fn test_span_ignores_brackets_in_strings() {
        let text = r#"Result: {"note": "has } and ] inside", "n": [1]} trailing"#;
        let (start, end) = find_json_span(text).unwrap();
        let value: Value = serde_json::from_str(&text[start..=end]).unwrap();
        assert_eq!(value["n"][0], 1);
    }

    #[test]
    fn test_span_with_escaped_quotes() {
        let text = r#"{"message": "Quote: \"Hello\""}"#;
        assert_eq!(find_json_span(text), Some((0, text.len() - 1)));
    }

    #[test]
    fn test_span_incomplete() {
        assert_eq!(find_json_span("[{\"a\": 1}"), None);
        assert_eq!(find_json_span("no json here"), None);
    }

    #[test]
    fn test_decode_with_surrounding_chatter() {
        let value: Vec<Value> =
            decode_json("Sure! Here is the analysis: [{\"name\": \"Salt\"}] Hope it helps.").unwrap();
        assert_eq!(value.len(), 1);
    }

    #[test]
    fn test_decode_malformed_is_error() {
        let result: Result<Vec<Value>> = decode_json("[{\"name\": \"Salt\",,}]");
        assert!(matches!(result, Err(AnalysisError::Decode(_))));
    }
}
