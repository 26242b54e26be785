//! JSON array extraction from model responses.
//!
//! Models often wrap JSON in markdown code fences or surround it with
//! conversational text, so the array is located before decoding.

/// Extract a JSON array from a response that may be wrapped in markdown.
///
/// Tries, in order:
/// 1. A ` ```json ... ``` ` fenced block
/// 2. A bare ` ``` ... ``` ` fenced block whose content starts with `[`
/// 3. The text from the first `[` to the last `]`
///
/// Returns `None` when no bracketed text is present.
pub fn extract_json_array(response: &str) -> Option<String> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json")
        && let Some(end) = trimmed[start + 7..].find("```")
    {
        let inner = trimmed[start + 7..start + 7 + end].trim();
        if inner.starts_with('[') {
            return Some(inner.to_string());
        }
    }

    if let Some(start) = trimmed.find("```")
        && let Some(end) = trimmed[start + 3..].find("```")
    {
        let inner = trimmed[start + 3..start + 3 + end].trim();
        if inner.starts_with('[') {
            return Some(inner.to_string());
        }
    }

    outermost_brackets(trimmed).map(str::to_string)
}

/// The slice from the first `[` to the last `]`, inclusive.
fn outermost_brackets(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Split a JSON array into its raw element values.
///
/// Elements are returned as [`serde_json::Value`] so callers can decode each
/// one independently and keep going when one is malformed.
pub fn array_elements(json: &str) -> Result<Vec<serde_json::Value>, serde_json::Error> {
    serde_json::from_str::<Vec<serde_json::Value>>(json)
}

/// Split text into its top-level `{ ... }` segments.
///
/// Used when the array as a whole is not valid JSON: each object can still
/// be decoded on its own. Tracks brace depth while respecting string
/// literals, so `{"msg": "use { and } carefully"}` is one segment.
pub fn top_level_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(begin) = start.take()
                {
                    objects.push(&text[begin..=idx]);
                }
            }
            _ => {}
        }
    }

    objects
}
