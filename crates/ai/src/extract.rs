//! Extraction of the JSON payload from a model completion.
//!
//! Models are instructed to answer in JSON but occasionally wrap the
//! payload in prose or a code fence. The extractor takes the span from the
//! first `{` to the last `}`.

/// Extract the JSON object span from completion text, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_passes_through() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn strips_surrounding_prose() {
        let text = "Here is my analysis:\n{\"complexity\": \"simple\"}\nLet me know!";
        assert_eq!(extract_json(text), Some("{\"complexity\": \"simple\"}"));
    }

    #[test]
    fn strips_code_fence() {
        let text = "```json\n{\"success\": true}\n```";
        assert_eq!(extract_json(text), Some("{\"success\": true}"));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json("I could not produce a fix."), None);
        assert_eq!(extract_json("} backwards {"), None);
    }
}
