//! Character-level normalization: smart quotes, control characters, invalid
//! and over-escaped sequences.

use crate::diagnostics::DiagnosticLog;
use crate::sanitize::finish;
use crate::scanner::string_spans;
use crate::types::{SanitizerConfig, StrategyResult};

/// Convert curly/smart quotes to their straight ASCII equivalents. Curly
/// singles become `'` and are picked up by single-quote conversion later.
pub fn normalize_smart_quotes(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        match ch {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => {
                out.push('"');
                log.push(format!("converted curly double quote at byte {i}"));
            }
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => {
                out.push('\'');
                log.push(format!("converted curly single quote at byte {i}"));
            }
            _ => out.push(ch),
        }
    }
    finish(text, out, log)
}

fn is_zero_width(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// Outside string literals, drop control and zero-width characters.
/// Structural whitespace (newline, carriage return, tab) stays.
pub fn strip_control_outside_strings(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let spans = string_spans(text);
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out = String::with_capacity(text.len());
    let mut span_idx = 0usize;
    for (i, ch) in text.char_indices() {
        while span_idx < spans.len() && i >= spans[span_idx].end {
            span_idx += 1;
        }
        let inside = span_idx < spans.len()
            && i >= spans[span_idx].start
            && i < spans[span_idx].end;
        if inside {
            out.push(ch);
            continue;
        }
        let control = ch.is_control() && !matches!(ch, '\n' | '\r' | '\t');
        if control || is_zero_width(ch) {
            log.push(format!(
                "removed U+{:04X} outside string at byte {i}",
                ch as u32
            ));
            continue;
        }
        out.push(ch);
    }
    finish(text, out, log)
}

/// Inside string literals: convert raw newline/tab/return to their short
/// escapes, escape other raw control characters as `\uXXXX`, and fix invalid
/// escape sequences by escaping the backslash itself.
pub fn escape_string_controls(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 16);
    let mut in_string = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if !in_string {
            if b == b'"' {
                in_string = true;
            }
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = false;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'\\' {
            match bytes.get(i + 1).copied() {
                Some(n) if matches!(n, b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                    out.push(b'\\');
                    out.push(n);
                    i += 2;
                }
                Some(b'u') => {
                    let hex_ok = bytes
                        .get(i + 2..i + 6)
                        .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
                    if hex_ok {
                        out.extend_from_slice(&bytes[i..i + 6]);
                        i += 6;
                    } else {
                        out.extend_from_slice(b"\\\\u");
                        log.push(format!("escaped broken unicode escape at byte {i}"));
                        i += 2;
                    }
                }
                Some(n) => {
                    out.extend_from_slice(b"\\\\");
                    log.push(format!(
                        "escaped invalid escape sequence \\{} at byte {i}",
                        n as char
                    ));
                    i += 1;
                }
                None => {
                    out.extend_from_slice(b"\\\\");
                    log.push(format!("escaped dangling backslash at byte {i}"));
                    i += 1;
                }
            }
            continue;
        }
        match b {
            b'\n' => {
                out.extend_from_slice(b"\\n");
                log.push(format!("escaped raw newline in string at byte {i}"));
            }
            b'\r' => {
                out.extend_from_slice(b"\\r");
                log.push(format!("escaped raw carriage return in string at byte {i}"));
            }
            b'\t' => {
                out.extend_from_slice(b"\\t");
                log.push(format!("escaped raw tab in string at byte {i}"));
            }
            c if c < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c).as_bytes());
                log.push(format!("escaped raw control character in string at byte {i}"));
            }
            _ => out.push(b),
        }
        i += 1;
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

/// Collapse pathological backslash runs before a quote to the minimal valid
/// escaping. Runs are consumed whole, so a partial reduction can never
/// re-trigger on its own output: an odd run of three or more backslashes
/// before a quote still means "escaped quote", spelled with one backslash.
pub fn reduce_over_escaping(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'\\' {
            i += 1;
        }
        let run = i - start;
        if run >= 3 && run % 2 == 1 && bytes.get(i) == Some(&b'"') {
            out.extend_from_slice(b"\\\"");
            i += 1;
            log.push(format!(
                "reduced {run} backslashes before quote at byte {start} to a single escape"
            ));
        } else {
            out.extend(std::iter::repeat(b'\\').take(run));
        }
    }
    let content = String::from_utf8(out).unwrap_or_else(|_| text.to_string());
    finish(text, content, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SanitizerConfig {
        SanitizerConfig::default()
    }

    #[test]
    fn smart_quotes_become_straight() {
        let r = normalize_smart_quotes("{\u{201C}name\u{201D}: \u{2018}Widget\u{2019}}", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "{\"name\": 'Widget'}");
        assert_eq!(r.diagnostics.len(), 4);
    }

    #[test]
    fn smart_quotes_noop_on_plain_text() {
        let r = normalize_smart_quotes(r#"{"a": 1}"#, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn zero_width_outside_strings_removed() {
        let r = strip_control_outside_strings("{\u{200B}\"a\": 1}", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "{\"a\": 1}");
    }

    #[test]
    fn zero_width_inside_strings_kept() {
        let text = "{\"a\": \"x\u{200B}y\"}";
        let r = strip_control_outside_strings(text, &cfg());
        assert!(!r.changed);
        assert_eq!(r.content, text);
    }

    #[test]
    fn raw_newline_in_string_escaped() {
        let r = escape_string_controls("{\"a\": \"line1\nline2\"}", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "{\"a\": \"line1\\nline2\"}");
    }

    #[test]
    fn structural_newlines_untouched() {
        let text = "{\n  \"a\": 1\n}";
        let r = escape_string_controls(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn invalid_escape_gets_backslash_escaped() {
        let r = escape_string_controls(r#"{"a": "bad\qescape"}"#, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"{"a": "bad\\qescape"}"#);
    }

    #[test]
    fn valid_escapes_pass_through() {
        let text = r#"{"a": "tab\there \u0041 quote\" done"}"#;
        let r = escape_string_controls(text, &cfg());
        assert!(!r.changed);
    }

    #[test]
    fn raw_control_char_becomes_unicode_escape() {
        let r = escape_string_controls("{\"a\": \"x\u{0007}y\"}", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, r#"{"a": "x\u0007y"}"#);
    }

    #[test]
    fn five_backslashes_before_quote_reduced() {
        let text = "{\"a\": \"x\\\\\\\\\\\" inside\"}";
        let r = reduce_over_escaping(text, &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "{\"a\": \"x\\\" inside\"}");
    }

    #[test]
    fn three_backslashes_before_quote_reduced() {
        let r = reduce_over_escaping("{\"a\": \"x\\\\\\\"y\"}", &cfg());
        assert!(r.changed);
        assert_eq!(r.content, "{\"a\": \"x\\\"y\"}");
    }

    #[test]
    fn even_backslash_runs_are_valid_and_kept() {
        let text = r#"{"p": "c:\\dir\\"}"#;
        let r = reduce_over_escaping(text, &cfg());
        assert!(!r.changed);
    }
}
