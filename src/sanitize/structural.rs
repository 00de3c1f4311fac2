//! Structural post-processing: dangling keys, truncated values inside
//! array-of-object structures, and junk tokens glued onto delimiters.

use crate::diagnostics::DiagnosticLog;
use crate::sanitize::{apply_edits, finish, next_significant, Edit};
use crate::scanner;
use crate::types::{SanitizerConfig, StrategyResult};

/// Give a key that never received a value an explicit `null`:
/// `{"a": }` becomes `{"a": null}`.
pub fn insert_null_for_dangling_keys(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut i = 0usize;
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
        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }
        if b == b':' {
            let dangling = match next_significant(bytes, i + 1) {
                None => true,
                Some((_, c)) => matches!(c, b',' | b'}' | b']'),
            };
            if dangling {
                log.push(format!("inserted null for dangling key at byte {i}"));
                edits.push(Edit {
                    start: i + 1,
                    end: i + 1,
                    replacement: " null".to_string(),
                });
            }
        }
        i += 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Quotes preceded by an even number of backslashes, i.e. real string
/// boundaries. An odd total means some string never terminates.
fn boundary_quote_count(bytes: &[u8]) -> usize {
    let mut count = 0usize;
    for i in 0..bytes.len() {
        if bytes[i] != b'"' {
            continue;
        }
        let mut backslashes = 0usize;
        let mut j = i;
        while j > 0 && bytes[j - 1] == b'\\' {
            backslashes += 1;
            j -= 1;
        }
        if backslashes % 2 == 0 {
            count += 1;
        }
    }
    count
}

/// Close a truncated string value inside an array-of-objects and split the
/// tail into a syntactically valid sibling element:
/// `[{"name": "alpha, {"name": "beta"}]` becomes
/// `[{"name": "alpha"}, {"name": "beta"}]`.
///
/// Gated on the text containing an odd number of string boundaries, so a
/// legitimate string that happens to contain `, {"` can never trigger it.
/// Applies one split per pass; the pipeline re-runs it to a fixed point.
pub fn split_truncated_array_objects(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    if boundary_quote_count(bytes) % 2 == 0 {
        return StrategyResult::unchanged(text);
    }
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b',' {
            i += 1;
            continue;
        }
        let looks_like_sibling = matches!(next_significant(bytes, i + 1), Some((p, b'{'))
            if matches!(next_significant(bytes, p + 1), Some((_, b'"'))));
        if looks_like_sibling
            && scanner::is_in_string(text, i, config.lookback_window)
            && scanner::is_in_array(text, i, config.lookback_window)
        {
            log.push(format!(
                "closed truncated value and split a new sibling element at byte {i}"
            ));
            let edits = [Edit {
                start: i,
                end: i,
                replacement: "\"}".to_string(),
            }];
            return finish(text, apply_edits(text, &edits), log);
        }
        i += 1;
    }
    StrategyResult::unchanged(text)
}

/// Remove stray 1-4 character tokens glued onto a structural delimiter, like
/// `}x,` or `],ab {`. A token followed by `:` is a key and is left alone; a
/// token after `,` directly inside an array is an element, not junk.
pub fn remove_glued_delimiter_tokens(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut i = 0usize;
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
        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }
        if matches!(b, b'}' | b']' | b',') {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
                end += 1;
            }
            let len = end - start;
            if (1..=4).contains(&len) {
                let boundary_ok = match bytes.get(end).copied() {
                    None => true,
                    Some(c) => {
                        c.is_ascii_whitespace() || matches!(c, b',' | b'}' | b']' | b'"' | b'{' | b'[')
                    }
                };
                let is_key = matches!(next_significant(bytes, end), Some((_, b':')));
                let array_element = b == b','
                    && scanner::is_directly_in_array(text, start, config.lookback_window);
                if boundary_ok && !is_key && !array_element {
                    let token = &text[start..end];
                    log.push(format!(
                        "removed stray token \"{token}\" glued to '{}' at byte {start}",
                        b as char
                    ));
                    edits.push(Edit {
                        start,
                        end,
                        replacement: String::new(),
                    });
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }
    finish(text, apply_edits(text, &edits), log)
}
