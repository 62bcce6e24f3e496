//! Recovering JSON objects from model output

use serde_json::Value;

/// Remove a surrounding Markdown code fence (with or without a language tag)
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string, e.g. `json`
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` object in `text`, honouring string literals
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse model output as a JSON object
///
/// Tries the fence-stripped text as a whole, then the first balanced object
/// inside it. Non-object values are rejected.
pub fn parse_json_object(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let parsed = serde_json::from_str::<Value>(cleaned)
        .ok()
        .or_else(|| first_json_object(cleaned).and_then(|obj| serde_json::from_str(obj).ok()))?;
    parsed.is_object().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let plain = r#"{"executive_summary": "Stable", "red_flags": "None"}"#;
        let fenced = format!("```json\n{plain}\n```");
        let bare_fence = format!("```\n{plain}\n```");

        assert_eq!(parse_json_object(plain), parse_json_object(&fenced));
        assert_eq!(parse_json_object(plain), parse_json_object(&bare_fence));
        assert_eq!(parse_json_object(plain).unwrap()["executive_summary"], "Stable");
    }

    #[test]
    fn test_first_object_with_surrounding_prose() {
        let text = r#"Here is the analysis: {"a": {"b": "}"}, "c": [1, 2]} Hope this helps {"d": 1}"#;
        assert_eq!(first_json_object(text), Some(r#"{"a": {"b": "}"}, "c": [1, 2]}"#));
        assert_eq!(parse_json_object(text), Some(json!({"a": {"b": "}"}, "c": [1, 2]})));
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"{"quote": "he said \"{hi}\""}"#;
        assert_eq!(first_json_object(text), Some(text));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert_eq!(parse_json_object("[1, 2, 3]"), None);
        assert_eq!(parse_json_object("not json at all"), None);
        assert_eq!(first_json_object("{ unterminated"), None);
    }
}
