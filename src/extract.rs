//! Locate the JSON payload inside a raw model completion.
//!
//! Models wrap their JSON in prose, markdown fences, or both. Extraction
//! runs before any repair strategy: a fenced ```json block wins if present
//! and contains a JSON-shaped body; otherwise a string-aware brace/bracket
//! balance scan finds the outermost structure. Stripped prefix/suffix text
//! is recorded as mutation steps.

/// Result of payload extraction. `span` is in byte offsets of the original
/// text; `truncated` means no balanced closing delimiter was found.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: String,
    pub span: (usize, usize),
    pub truncated: bool,
    pub steps: Vec<String>,
}

/// Find a ``` fenced block and return (inner_start, inner_end) for its body.
/// An optional `json` language tag after the opening fence is skipped.
fn find_fenced_body(text: &str) -> Option<(usize, usize)> {
    let open = text.find("```")?;
    let mut body_start = open + 3;
    let after = &text[body_start..];
    let trimmed = after.trim_start();
    body_start += after.len() - trimmed.len();
    if trimmed.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        body_start += 4;
        let after_tag = &text[body_start..];
        let trimmed_tag = after_tag.trim_start();
        body_start += after_tag.len() - trimmed_tag.len();
    }
    let close_rel = text[body_start..].find("```")?;
    Some((body_start, body_start + close_rel))
}

fn balance_scan(text: &str) -> Extraction {
    let bytes = text.as_bytes();
    let start = match (text.find('{'), text.find('[')) {
        (None, None) => {
            return Extraction {
                content: text.to_string(),
                span: (0, text.len()),
                truncated: true,
                steps: vec!["no JSON structure found in response text".to_string()],
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (Some(a), Some(b)) => a.min(b),
    };

    let mut in_string = false;
    let mut escape = false;
    let mut depth: i64 = 0;
    let mut end = bytes.len();
    let mut truncated = true;

    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth -= 1,
            _ => {}
        }
        if depth == 0 && i >= start {
            end = i + 1;
            truncated = false;
            break;
        }
        i += 1;
    }

    let mut steps = Vec::new();
    if start > 0 {
        steps.push(format!(
            "stripped {start} byte(s) of leading text before the JSON payload"
        ));
    }
    if end < text.len() {
        steps.push(format!(
            "stripped {} byte(s) of trailing text after the JSON payload",
            text.len() - end
        ));
    }
    if truncated {
        steps.push("response appears truncated: structure never closes".to_string());
    }
    Extraction {
        content: text[start..end].to_string(),
        span: (start, end),
        truncated,
        steps,
    }
}

/// Extract the most plausible JSON payload from a raw completion.
pub fn extract_payload(text: &str) -> Extraction {
    if let Some((inner_start, inner_end)) = find_fenced_body(text) {
        let inner = text[inner_start..inner_end].trim();
        if inner.starts_with('{') || inner.starts_with('[') {
            let mut steps = vec!["extracted JSON payload from a fenced code block".to_string()];
            if inner_start > 3 || inner_end < text.len() {
                steps.push(format!(
                    "discarded {} byte(s) of text surrounding the fenced block",
                    text.len() - inner.len()
                ));
            }
            return Extraction {
                content: inner.to_string(),
                span: (inner_start, inner_end),
                truncated: false,
                steps,
            };
        }
    }
    balance_scan(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_wins() {
        let text = "Sure, here you go:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        let ex = extract_payload(text);
        assert_eq!(ex.content, "{\"a\": 1}");
        assert!(!ex.truncated);
        assert!(!ex.steps.is_empty());
    }

    #[test]
    fn fence_without_language_tag() {
        let text = "```\n[1, 2]\n```";
        let ex = extract_payload(text);
        assert_eq!(ex.content, "[1, 2]");
    }

    #[test]
    fn balance_scan_strips_prose() {
        let text = "The result is {\"a\": [1, 2]} as requested.";
        let ex = extract_payload(text);
        assert_eq!(ex.content, "{\"a\": [1, 2]}");
        assert_eq!(ex.span.0, text.find('{').unwrap());
        assert_eq!(ex.steps.len(), 2);
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_scan() {
        let text = "{\"a\": \"}\"}";
        let ex = extract_payload(text);
        assert_eq!(ex.content, text);
        assert!(ex.steps.is_empty());
    }

    #[test]
    fn truncated_structure_is_flagged() {
        let ex = extract_payload("{\"a\": [1, 2");
        assert!(ex.truncated);
        assert!(ex.steps.iter().any(|s| s.contains("truncated")));
    }

    #[test]
    fn clean_json_is_untouched() {
        let text = "{\"a\": 1}";
        let ex = extract_payload(text);
        assert_eq!(ex.content, text);
        assert_eq!(ex.span, (0, text.len()));
        assert!(ex.steps.is_empty());
    }

    #[test]
    fn no_json_at_all() {
        let ex = extract_payload("I cannot produce that.");
        assert!(ex.truncated);
    }
}
