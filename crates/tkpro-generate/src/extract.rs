//! Recovery of a JSON object embedded in free-form model output.
//!
//! Models wrap structured answers in code fences or surround them with
//! prose. [`extract_json_object`] strips fences, then returns the first
//! balanced `{...}` span that parses as a JSON object. When none parses, it
//! falls back to the span from the first `{` to the last `}` so the caller's
//! parser reports a meaningful error.

/// Removes Markdown code-fence markers (```` ```json ```` and ```` ``` ````)
/// and trims the result.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_owned()
}

/// Returns the JSON object embedded in `text`, if any `{...}` span exists.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<String> {
    let cleaned = strip_code_fences(text);

    if let Some(object) = first_valid_object(&cleaned) {
        return Some(object.to_owned());
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| cleaned[start..=end].to_owned())
}

fn first_valid_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let len = balanced_len(&text[start..])?;
        let candidate = &text[start..start + len];
        serde_json::from_str::<serde_json::Value>(candidate)
            .is_ok_and(|value| value.is_object())
            .then_some(candidate)
    })
}

/// Byte length of the brace-balanced span starting at `text[0] == '{'`.
/// Braces inside JSON strings are ignored.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
