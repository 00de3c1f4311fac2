//! Removal of model chatter that leaks between JSON tokens, and of orphaned
//! metadata-looking properties.
//!
//! Detection is shape-based — small named classifiers over length, casing
//! and separator patterns — rather than a fixed phrase list, so paraphrased
//! chatter is caught too.

use crate::diagnostics::DiagnosticLog;
use crate::sanitize::properties::key_sites;
use crate::sanitize::{apply_edits, finish, next_significant, prev_significant, Edit};
use crate::scanner::string_span_at;
use crate::types::{SanitizerConfig, StrategyResult};

// ---------------------------------------------------------------------------
// Shape classifiers
// ---------------------------------------------------------------------------

/// A lone lowercase word of the kind models drop between tokens
/// ("sure", "okay", "done").
pub(crate) fn is_short_lowercase_word(s: &str) -> bool {
    (2..=12).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_lowercase())
}

/// Free prose: several words of mostly letters, no JSON structure.
pub(crate) fn looks_like_sentence(s: &str) -> bool {
    if s.len() < 8 || !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return false;
    }
    let spaces = s.bytes().filter(|b| *b == b' ').count();
    if spaces < 1 {
        return false;
    }
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '\'' | '!' | '?' | '-' | '(' | ')')
    })
}

/// "to be continued"-style markers: a run of dots or an ellipsis, possibly
/// with surrounding whitespace.
pub(crate) fn looks_like_continuation_marker(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c == '.' || c == '\u{2026}')
}

/// Artifact property names: tool/model metadata that does not belong to the
/// payload (`extra_*`, `llm_*`, `ai_*`, `*_thoughts`, `*_reasoning`, ...).
pub(crate) fn looks_like_artifact_key(name: &str) -> bool {
    const PREFIXES: &[&str] = &["extra_", "llm_", "ai_"];
    const SUFFIXES: &[&str] = &["_thoughts", "_reasoning", "_thinking", "_commentary"];
    let lower = name.to_ascii_lowercase();
    PREFIXES.iter().any(|p| lower.starts_with(p))
        || SUFFIXES.iter().any(|s| lower.ends_with(s))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn is_json_scalar(t: &str) -> bool {
    matches!(t, "true" | "false" | "null") || t.parse::<f64>().is_ok()
}

/// Remove sentence-shaped commentary and continuation markers sitting between
/// JSON tokens. Value positions (directly after `:`) and key positions
/// (directly before `:`) are left alone — earlier strategies own those.
pub fn remove_stray_commentary(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut i = 0usize;
    let mut prev_structural: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            let span = match string_span_at(text, i) {
                Some(span) => span,
                None => break,
            };
            prev_structural = Some(b'"');
            i = if span.closed { span.end + 1 } else { span.end };
            continue;
        }
        if matches!(b, b'{' | b'}' | b'[' | b']' | b',' | b':') {
            prev_structural = Some(b);
            i += 1;
            continue;
        }
        // Start of a free-text segment: everything up to the next structural
        // byte or string start.
        let start = i;
        while i < bytes.len() && !matches!(bytes[i], b'{' | b'}' | b'[' | b']' | b',' | b':' | b'"')
        {
            i += 1;
        }
        let next_structural = bytes.get(i).copied();
        let segment = &text[start..i];
        let t = segment.trim();
        if t.is_empty() || is_json_scalar(t) {
            continue;
        }
        let value_position = prev_structural == Some(b':');
        let key_position = next_structural == Some(b':');
        if value_position || key_position {
            continue;
        }
        // A lone word is only provably stray in an object member position;
        // in an array it may be a bare element, which quoting already owns.
        let member_position = matches!(prev_structural, Some(b',') | Some(b'{'))
            && matches!(next_structural, Some(b',') | Some(b'}'));
        let stray = looks_like_sentence(t)
            || looks_like_continuation_marker(t)
            || (is_short_lowercase_word(t) && member_position);
        if stray {
            let shown: String = t.chars().take(40).collect();
            log.push(format!("removed stray text \"{shown}\" at byte {start}"));
            edits.push(Edit {
                start,
                end: i,
                replacement: String::new(),
            });
        }
    }
    if edits.is_empty() {
        return StrategyResult::unchanged(text);
    }
    let removed = apply_edits(text, &edits);
    let cleaned = collapse_stray_commas(&removed, &mut log);
    finish(text, cleaned, log)
}

/// After a segment removal, neighbouring delimiters may be left doubled
/// (`, ,`) or leading (`[,`). Collapse them so the removal is structurally
/// clean.
fn collapse_stray_commas(text: &str, log: &mut DiagnosticLog) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut last_sig: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            let span = match string_span_at(text, i) {
                Some(span) => span,
                None => {
                    out.extend_from_slice(&bytes[i..]);
                    break;
                }
            };
            let end = if span.closed { span.end + 1 } else { span.end };
            out.extend_from_slice(&bytes[i..end]);
            last_sig = Some(b'"');
            i = end;
            continue;
        }
        if b == b',' && matches!(last_sig, Some(b',') | Some(b'{') | Some(b'[')) {
            log.push(format!("collapsed stray comma at byte {i}"));
            i += 1;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

/// Remove whole members whose key matches the artifact shape, unless the
/// schema actually declares that property.
pub fn remove_artifact_properties(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    for site in key_sites(text) {
        let key = &text[site.start..site.end];
        if !looks_like_artifact_key(key) || config.is_known_property(key) {
            continue;
        }
        let value_end = match value_end_after(text, site.colon) {
            Some(end) => end,
            None => continue,
        };
        // Take the following comma with the member, or the preceding one for
        // a trailing member.
        let (start, end) = match next_significant(bytes, value_end) {
            Some((p, b',')) => (site.open, p + 1),
            _ => match prev_significant(bytes, site.open) {
                Some(b',') => {
                    let mut p = site.open;
                    while p > 0 && bytes[p - 1] != b',' {
                        p -= 1;
                    }
                    (p - 1, value_end)
                }
                _ => (site.open, value_end),
            },
        };
        log.push(format!("removed artifact property \"{key}\""));
        edits.push(Edit {
            start,
            end,
            replacement: String::new(),
        });
    }
    finish(text, apply_edits(text, &edits), log)
}

/// End offset (exclusive) of the scalar or balanced container value that
/// starts after `colon`. Returns `None` when the value is missing or runs
/// off the end of the text unbalanced.
fn value_end_after(text: &str, colon: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (start, first) = next_significant(bytes, colon + 1)?;
    match first {
        b'"' => {
            let span = string_span_at(text, start)?;
            span.closed.then_some(span.end + 1)
        }
        b'{' | b'[' => {
            let mut depth = 0i64;
            let mut i = start;
            let mut in_string = false;
            let mut escape = false;
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
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i + 1);
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            None
        }
        _ => {
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric()
                    || matches!(bytes[end], b'.' | b'-' | b'+' | b'_'))
            {
                end += 1;
            }
            (end > start).then_some(end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SanitizerConfig {
        SanitizerConfig::default()
    }

    #[test]
    fn classifier_short_lowercase_word() {
        assert!(is_short_lowercase_word("sure"));
        assert!(is_short_lowercase_word("okay"));
        assert!(!is_short_lowercase_word("Sure"));
        assert!(!is_short_lowercase_word("a"));
        assert!(!is_short_lowercase_word("two words"));
    }

    #[test]
    fn classifier_sentence() {
        assert!(looks_like_sentence("I think this is correct"));
        assert!(looks_like_sentence("As an AI model I cannot verify this"));
        assert!(!looks_like_sentence("alpha"));
        assert!(!looks_like_sentence("a: b"));
    }

    #[test]
    fn classifier_continuation_marker() {
        assert!(looks_like_continuation_marker("..."));
        assert!(looks_like_continuation_marker(" \u{2026} "));
        assert!(!looks_like_continuation_marker("a..."));
    }

    #[test]
    fn classifier_artifact_key() {
        assert!(looks_like_artifact_key("llm_confidence"));
        assert!(looks_like_artifact_key("extra_data"));
        assert!(looks_like_artifact_key("ai_notes"));
        assert!(looks_like_artifact_key("model_thoughts"));
        assert!(looks_like_artifact_key("chain_reasoning"));
        assert!(!looks_like_artifact_key("name"));
        assert!(!looks_like_artifact_key("domain"));
    }

    #[test]
    fn sentence_between_members_removed() {
        let r = remove_stray_commentary(
            r#"{"a": 1, I double checked this value, "b": 2}"#,
            &cfg(),
        );
        assert!(r.changed);
        // The doubled comma left by the removal is collapsed in the same pass.
        assert_eq!(r.content, r#"{"a": 1, "b": 2}"#);
    }

    #[test]
    fn continuation_marker_removed() {
        // The trailing comma is a later strategy's concern.
        let r = remove_stray_commentary("[\"a\", \"b\", ...]", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "[\"a\", \"b\",]");
    }

    #[test]
    fn prose_inside_strings_kept() {
        let text = r#"{"note": "I think this is correct"}"#;
        let r = remove_stray_commentary(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn bare_values_and_keys_left_for_other_strategies() {
        let text = r#"{"a": pending, name: 1}"#;
        let r = remove_stray_commentary(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn artifact_property_removed_with_delimiter() {
        let r = remove_artifact_properties(
            r#"{"name": "x", "llm_confidence": 0.8, "value": 2}"#,
            &cfg(),
        );
        assert!(r.changed);
        assert_eq!(r.content, r#"{"name": "x",  "value": 2}"#);
    }

    #[test]
    fn trailing_artifact_property_takes_preceding_comma() {
        let r = remove_artifact_properties(r#"{"name": "x", "ai_thoughts": "hmm"}"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"{"name": "x"}"#);
    }

    #[test]
    fn artifact_with_object_value_removed_whole() {
        let r = remove_artifact_properties(r#"{"extra_meta": {"a": 1}, "name": "x"}"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"{ "name": "x"}"#);
    }

    #[test]
    fn declared_artifact_lookalike_kept() {
        let config = SanitizerConfig {
            known_properties: vec!["ai_rating".to_string()],
            ..SanitizerConfig::default()
        };
        let text = r#"{"ai_rating": 5}"#;
        let r = remove_artifact_properties(text, &config);
        assert!(!r.changed);
    }

    #[test]
    fn unbalanced_value_not_removed() {
        let text = r#"{"llm_notes": {"unclosed": 1"#;
        let r = remove_artifact_properties(text, &cfg());
        assert!(!r.changed);
    }
}
