//! Assignment-syntax and token-level repairs: comments, foreign literals,
//! separators, quoting, trailing commas, unterminated structures.

use crate::diagnostics::DiagnosticLog;
use crate::sanitize::{apply_edits, finish, next_significant, Edit};
use crate::types::{SanitizerConfig, StrategyResult};

/// Strip `//` line comments and `/* */` block comments outside strings.
pub fn strip_comments(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut in_string = false;
    let mut escape = false;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
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
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            let start = i;
            while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                i += 1;
            }
            log.push(format!("removed line comment at bytes {start}..{i}"));
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let start = i;
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            log.push(format!("removed block comment at bytes {start}..{i}"));
            continue;
        }
        out.push(b);
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

/// Map foreign literal spellings (`True`, `False`, `None`, `undefined`) to
/// JSON literals, outside strings.
pub fn normalize_literal_tokens(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut in_string = false;
    let mut escape = false;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
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
            out.push(b);
            i += 1;
            continue;
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &text[start..i];
            let mapped = match word {
                "True" => Some("true"),
                "False" => Some("false"),
                "None" | "undefined" => Some("null"),
                _ => None,
            };
            match mapped {
                Some(m) => {
                    out.extend_from_slice(m.as_bytes());
                    log.push(format!("mapped literal {word} to {m} at byte {start}"));
                }
                None => out.extend_from_slice(word.as_bytes()),
            }
            continue;
        }
        out.push(b);
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

/// Normalize non-standard key/value separators: `:=` and `=>` become `:`, a
/// bare `=` after a quoted key becomes `:`, junk glued onto `:` is dropped.
pub fn normalize_key_separators(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut in_string = false;
    let mut escape = false;
    let mut last_sig: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
                last_sig = Some(b'"');
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b':' {
            out.push(b':');
            last_sig = Some(b':');
            i += 1;
            while i < bytes.len() && matches!(bytes[i], b'=' | b';' | b'~') {
                log.push(format!(
                    "dropped stray '{}' glued to ':' at byte {i}",
                    bytes[i] as char
                ));
                i += 1;
            }
            continue;
        }
        if b == b'=' && last_sig == Some(b'"') {
            let mut end = i + 1;
            if bytes.get(end) == Some(&b'>') {
                end += 1;
            }
            log.push(format!(
                "normalized '{}' separator to ':' at byte {i}",
                &text[i..end]
            ));
            out.push(b':');
            last_sig = Some(b':');
            i = end;
            continue;
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        out.push(b);
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

/// Convert single-quoted keys and values to double-quoted strings. Only fires
/// at positions where a string can start (after `{`, `[`, `,`, `:` or at the
/// beginning), so apostrophes in prose are left alone.
pub fn convert_single_quoted_strings(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut in_string = false;
    let mut escape = false;
    let mut last_sig: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
                last_sig = Some(b'"');
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }
        let opener_position = matches!(last_sig, None | Some(b'{') | Some(b'[') | Some(b',') | Some(b':'));
        if b == b'\'' && opener_position {
            // Find the closing single quote, escape-aware.
            let mut j = i + 1;
            let mut esc = false;
            let mut close: Option<usize> = None;
            while j < bytes.len() {
                let c = bytes[j];
                if esc {
                    esc = false;
                } else if c == b'\\' {
                    esc = true;
                } else if c == b'\'' {
                    close = Some(j);
                    break;
                }
                j += 1;
            }
            let followed_ok = close.is_some_and(|j| {
                match next_significant(bytes, j + 1) {
                    None => true,
                    Some((_, c)) => matches!(c, b',' | b':' | b'}' | b']'),
                }
            });
            if let (Some(j), true) = (close, followed_ok) {
                out.push(b'"');
                let mut k = i + 1;
                while k < j {
                    let c = bytes[k];
                    if c == b'\\' && bytes.get(k + 1) == Some(&b'\'') {
                        out.push(b'\'');
                        k += 2;
                    } else if c == b'"' {
                        out.extend_from_slice(b"\\\"");
                        k += 1;
                    } else {
                        out.push(c);
                        k += 1;
                    }
                }
                out.push(b'"');
                log.push(format!(
                    "converted single-quoted string at bytes {i}..{} to double quotes",
                    j + 1
                ));
                last_sig = Some(b'"');
                i = j + 1;
                continue;
            }
        }
        if !b.is_ascii_whitespace() {
            last_sig = Some(b);
        }
        out.push(b);
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

fn is_json_literal(token: &str) -> bool {
    matches!(token, "true" | "false" | "null")
}

/// Re-quote bareword values after a `:` that are not JSON literals or
/// numbers. One fix can reveal an adjacent one, hence this strategy runs to a
/// fixed point under the pipeline's iteration cap.
pub fn quote_unquoted_values(text: &str, config: &SanitizerConfig) -> StrategyResult {
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
        if b != b':' {
            i += 1;
            continue;
        }
        i += 1;
        let (start, first) = match next_significant(bytes, i) {
            Some(found) => found,
            None => break,
        };
        if matches!(first, b'"' | b'{' | b'[' | b',' | b'}' | b']' | b':') {
            continue;
        }
        let mut end = start;
        while end < bytes.len() && !matches!(bytes[end], b',' | b'}' | b']' | b'\n' | b'"') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'"') {
            continue; // runs into a string, leave for other strategies
        }
        let token = text[start..end].trim_end();
        if token.is_empty() || is_json_literal(token) || token.parse::<f64>().is_ok() {
            i = end;
            continue;
        }
        let token_end = start + token.len();
        edits.push(Edit {
            start,
            end: token_end,
            replacement: format!("\"{token}\""),
        });
        log.push(format!(
            "quoted unquoted value \"{token}\" at byte {start}"
        ));
        i = end;
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Remove commas that directly precede `}`/`]` or the end of input.
pub fn remove_trailing_commas(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut in_string = false;
    let mut escape = false;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
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
            out.push(b);
            i += 1;
            continue;
        }
        if b == b',' {
            match next_significant(bytes, i + 1) {
                None => {
                    log.push(format!("removed trailing comma at byte {i}"));
                    i += 1;
                    continue;
                }
                Some((_, c)) if c == b'}' || c == b']' => {
                    log.push(format!("removed trailing comma at byte {i}"));
                    i += 1;
                    continue;
                }
                _ => {}
            }
        }
        out.push(b);
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

/// Close an unterminated string, then append missing closers in nesting
/// order. Runs last so earlier strategies see the original tail.
pub fn close_unterminated_structures(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    for &b in bytes {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(b),
            b'}' => {
                if stack.last() == Some(&b'{') {
                    stack.pop();
                }
            }
            b']' => {
                if stack.last() == Some(&b'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    if in_string {
        out.push('"');
        log.push(format!("closed unterminated string at byte {}", text.len()));
    }
    if !stack.is_empty() {
        let closers: String = stack
            .iter()
            .rev()
            .map(|b| if *b == b'{' { '}' } else { ']' })
            .collect();
        log.push(format!(
            "appended {} missing closer(s): {closers}",
            closers.len()
        ));
        out.push_str(&closers);
    }
    finish(text, out, log)
}
