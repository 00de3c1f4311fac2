//! Array-element repair: corrupted-prefix replacement, stray lead-in words,
//! bareword quoting, duplicate entries, and missing commas between string
//! elements. Every rewrite is gated on the scanner confirming the site is
//! directly inside an array.

use crate::diagnostics::DiagnosticLog;
use crate::sanitize::{apply_edits, finish, next_significant, Edit};
use crate::scanner::{is_directly_in_array, string_span_at};
use crate::types::{SanitizerConfig, StrategyResult};

/// Corruption markers that flag an array entry as a failed re-attempt.
const CORRUPTION_MARKERS: &[&str] = &[
    "CORRUPTED",
    "CORRUPT",
    "GARBLED",
    "MALFORMED",
    "INVALID",
    "DUPLICATE",
    "RETRY",
];

fn is_marker_word(s: &str) -> bool {
    let t = s.trim();
    t.contains('\u{FFFD}') || CORRUPTION_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m))
}

/// Shared-prefix test for "second attempt at the same entry": at least three
/// common leading bytes covering half of the shorter content.
fn shares_entry_prefix(a: &str, b: &str) -> bool {
    let common = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    common >= 3 && common * 2 >= a.len().min(b.len())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-'
}

/// Replace known corrupted prefixes on array elements, quoted or bare. Runs
/// before generic bareword quoting because a corrupted identifier can still
/// look like a valid one.
pub fn replace_corrupted_array_tokens(text: &str, config: &SanitizerConfig) -> StrategyResult {
    if config.prefix_map.is_empty() {
        return StrategyResult::unchanged(text);
    }
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            let span = match string_span_at(text, i) {
                Some(span) => span,
                None => break,
            };
            if matches!(last_sig, Some(b'[') | Some(b','))
                && span.closed
                && is_directly_in_array(text, i, config.lookback_window)
            {
                let content = &text[span.start..span.end];
                if let Some((bad, good)) = config
                    .prefix_map
                    .iter()
                    .find(|(bad, _)| !bad.is_empty() && content.starts_with(bad.as_str()))
                {
                    let fixed = format!("{good}{}", &content[bad.len()..]);
                    log.push(format!(
                        "replaced corrupted element prefix \"{content}\" -> \"{fixed}\""
                    ));
                    edits.push(Edit {
                        start: span.start,
                        end: span.end,
                        replacement: fixed,
                    });
                }
            }
            last_sig = Some(b'"');
            i = if span.closed { span.end + 1 } else { span.end };
            continue;
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            let mut end = i + 1;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            if matches!(last_sig, Some(b'[') | Some(b','))
                && is_directly_in_array(text, start, config.lookback_window)
            {
                let token = &text[start..end];
                if let Some((bad, good)) = config
                    .prefix_map
                    .iter()
                    .find(|(bad, _)| !bad.is_empty() && token.starts_with(bad.as_str()))
                {
                    let fixed = format!("{good}{}", &token[bad.len()..]);
                    log.push(format!(
                        "replaced corrupted bare token \"{token}\" -> \"{fixed}\""
                    ));
                    edits.push(Edit {
                        start,
                        end,
                        replacement: fixed,
                    });
                }
            }
            last_sig = Some(bytes[end - 1]);
            i = end;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        i += 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Drop a stray bare word sitting in front of a quoted array element:
/// `[note "alpha"]` becomes `["alpha"]`.
pub fn strip_array_leadin_words(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            let span = match string_span_at(text, i) {
                Some(span) => span,
                None => break,
            };
            last_sig = Some(b'"');
            i = if span.closed { span.end + 1 } else { span.end };
            continue;
        }
        if b.is_ascii_alphabetic() && matches!(last_sig, Some(b'[') | Some(b',')) {
            let start = i;
            let mut end = i + 1;
            while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
                end += 1;
            }
            let mut gap_end = end;
            while gap_end < bytes.len() && matches!(bytes[gap_end], b' ' | b'\t') {
                gap_end += 1;
            }
            if gap_end > end
                && bytes.get(gap_end) == Some(&b'"')
                && is_directly_in_array(text, start, config.lookback_window)
            {
                let word = &text[start..end];
                log.push(format!(
                    "removed stray lead-in word \"{word}\" before array element at byte {start}"
                ));
                edits.push(Edit {
                    start,
                    end: gap_end,
                    replacement: String::new(),
                });
                i = gap_end;
                continue;
            }
            last_sig = Some(bytes[end - 1]);
            i = end;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        i += 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Quote bareword, dotted-identifier, and ALL-CAPS constant tokens that sit
/// directly inside an array.
pub fn quote_bare_array_elements(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            let span = match string_span_at(text, i) {
                Some(span) => span,
                None => break,
            };
            last_sig = Some(b'"');
            i = if span.closed { span.end + 1 } else { span.end };
            continue;
        }
        if (b.is_ascii_alphabetic() || b == b'_')
            && matches!(last_sig, Some(b'[') | Some(b','))
        {
            let start = i;
            let mut end = i + 1;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            let token = &text[start..end];
            let quotable = !matches!(token, "true" | "false" | "null")
                && token.parse::<f64>().is_err()
                && is_directly_in_array(text, start, config.lookback_window);
            if quotable {
                log.push(format!("quoted bare array element \"{token}\" at byte {start}"));
                edits.push(Edit {
                    start,
                    end,
                    replacement: format!("\"{token}\""),
                });
            }
            last_sig = Some(bytes[end - 1]);
            i = end;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        i += 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Drop array entries that look like a second, malformed attempt at the
/// previous entry: a partial or prefix-sharing string glued into the same
/// slot, or a comma-separated re-attempt flagged by a corruption marker.
/// Must run before missing-comma insertion, which would otherwise stitch the
/// re-attempt in as a legitimate sibling.
pub fn remove_duplicate_array_entries(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'"' {
            if !b.is_ascii_whitespace() {
                last_sig = Some(b);
            }
            i += 1;
            continue;
        }
        let span = match string_span_at(text, i) {
            Some(span) => span,
            None => break,
        };
        let element_position = matches!(last_sig, Some(b'[') | Some(b','));
        if !element_position
            || !span.closed
            || !is_directly_in_array(text, i, config.lookback_window)
        {
            last_sig = Some(b'"');
            i = if span.closed { span.end + 1 } else { span.end };
            continue;
        }
        let content = &text[span.start..span.end];
        let after = span.end + 1;

        match next_significant(bytes, after) {
            // Same slot: a second string with no comma in between.
            Some((p, b'"')) => {
                if let Some(second) = string_span_at(text, p) {
                    let second_content = &text[second.start..second.end];
                    if !second.closed {
                        log.push(format!(
                            "dropped partial duplicate of \"{content}\" at byte {p}"
                        ));
                        edits.push(Edit {
                            start: after,
                            end: second.end,
                            replacement: String::new(),
                        });
                        i = second.end;
                        continue;
                    }
                    if shares_entry_prefix(content, second_content) {
                        log.push(format!(
                            "dropped duplicate re-attempt \"{second_content}\" after \"{content}\""
                        ));
                        edits.push(Edit {
                            start: after,
                            end: second.end + 1,
                            replacement: String::new(),
                        });
                        last_sig = Some(b'"');
                        i = second.end + 1;
                        continue;
                    }
                }
            }
            // Next slot: drop it only when flagged as a corrupted re-attempt.
            Some((p, b',')) => {
                if let Some((q, b'"')) = next_significant(bytes, p + 1) {
                    if let Some(second) = string_span_at(text, q) {
                        if second.closed {
                            let second_content = &text[second.start..second.end];
                            let suffix_marker = second_content
                                .strip_prefix(content)
                                .map(is_marker_word)
                                .unwrap_or(false)
                                && second_content.len() > content.len();
                            if suffix_marker || is_marker_word(second_content) {
                                log.push(format!(
                                    "dropped corrupted entry \"{second_content}\" at byte {q}"
                                ));
                                edits.push(Edit {
                                    start: p,
                                    end: second.end + 1,
                                    replacement: String::new(),
                                });
                                last_sig = Some(b'"');
                                i = second.end + 1;
                                continue;
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        last_sig = Some(b'"');
        i = span.end + 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Insert the missing comma between adjacent string elements on the same or
/// consecutive lines.
pub fn insert_missing_array_commas(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'"' {
            if !b.is_ascii_whitespace() {
                last_sig = Some(b);
            }
            i += 1;
            continue;
        }
        let open = i;
        let span = match string_span_at(text, i) {
            Some(span) => span,
            None => break,
        };
        let element_position = matches!(last_sig, Some(b'[') | Some(b','));
        last_sig = Some(b'"');
        i = if span.closed { span.end + 1 } else { span.end };
        if !element_position || !span.closed {
            continue;
        }
        if let Some((p, b'"')) = next_significant(bytes, span.end + 1) {
            let gap = &text[span.end + 1..p];
            let same_or_next_line = gap.bytes().filter(|b| *b == b'\n').count() <= 1;
            if same_or_next_line && is_directly_in_array(text, open, config.lookback_window) {
                log.push(format!(
                    "inserted missing comma between array elements at byte {}",
                    span.end + 1
                ));
                edits.push(Edit {
                    start: span.end + 1,
                    end: span.end + 1,
                    replacement: ",".to_string(),
                });
                // Treat the next string as the new left-hand element.
                last_sig = Some(b',');
            }
        }
    }
    finish(text, apply_edits(text, &edits), log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SanitizerConfig {
        SanitizerConfig::default()
    }

    #[test]
    fn bare_identifier_quoted() {
        let r = quote_bare_array_elements(r#"["alpha", beta, "gamma"]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha", "beta", "gamma"]"#);
    }

    #[test]
    fn dotted_and_caps_tokens_quoted() {
        let r = quote_bare_array_elements(r#"[foo.bar.baz, SOME_CONST]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["foo.bar.baz", "SOME_CONST"]"#);
    }

    #[test]
    fn literals_and_numbers_untouched() {
        let text = r#"[true, false, null, 1.5]"#;
        let r = quote_bare_array_elements(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn barewords_in_objects_untouched() {
        // Not directly in an array: the bareword value is some other
        // strategy's concern.
        let text = r#"{"a": pending}"#;
        let r = quote_bare_array_elements(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn corrupted_prefix_tried_before_quoting() {
        let mut config = cfg();
        config
            .prefix_map
            .insert("xx_".to_string(), "".to_string());
        let r = replace_corrupted_array_tokens(r#"["xx_alpha", xx_beta]"#, &config);
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha", beta]"#);
    }

    #[test]
    fn leadin_word_removed() {
        let r = strip_array_leadin_words(r#"[note "alpha", "beta"]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha", "beta"]"#);
    }

    #[test]
    fn bare_element_without_following_quote_kept() {
        let text = r#"["alpha", beta, "gamma"]"#;
        let r = strip_array_leadin_words(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn partial_duplicate_in_same_slot_dropped() {
        let r = remove_duplicate_array_entries("[\"alpha\" \"alp", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "[\"alpha\"");
    }

    #[test]
    fn prefix_sharing_reattempt_dropped() {
        let r = remove_duplicate_array_entries(r#"["alpha" "alphaX", "beta"]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha" , "beta"]"#);
    }

    #[test]
    fn marker_flagged_entry_dropped() {
        let r = remove_duplicate_array_entries(r#"["alpha", "alpha CORRUPTED", "beta"]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha", "beta"]"#);
    }

    #[test]
    fn distinct_adjacent_strings_kept_for_comma_insertion() {
        let text = r#"["alpha" "beta"]"#;
        let r = remove_duplicate_array_entries(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn missing_comma_inserted() {
        let r = insert_missing_array_commas(r#"["alpha" "beta"]"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"["alpha", "beta"]"#);
    }

    #[test]
    fn missing_comma_across_one_newline() {
        let r = insert_missing_array_commas("[\"alpha\"\n\"beta\"]", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "[\"alpha\",\n\"beta\"]");
    }

    #[test]
    fn distant_strings_not_joined() {
        let text = "[\"alpha\"\n\n\n\"beta\"]";
        let r = insert_missing_array_commas(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn object_strings_not_joined() {
        let text = r#"{"a" "b": 1}"#;
        let r = insert_missing_array_commas(text, &cfg());
        assert!(!r.changed);
    }
}
