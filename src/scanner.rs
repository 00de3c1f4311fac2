//! Lexical context queries over possibly-invalid JSON text.
//!
//! Repair strategies need to know, for a given byte offset, whether the
//! offset sits inside a string literal, inside an array, or directly inside
//! an array (nearest enclosing bracket is `[`, not `{`). The text is partial
//! and possibly invalid, so these answers are derived by scanning rather than
//! parsing: a bounded backward walk from the offset, tracking quote parity
//! (escape-aware) and bracket/brace debt outside of strings.
//!
//! All queries are pure functions of `(text, offset, window)` — no state
//! survives across calls. The bounded window keeps each query O(window)
//! instead of O(text); the cost is that a single string literal longer than
//! the window is misclassified. That trade-off is pinned by a boundary test
//! rather than silently widened.

/// Backward scan budget in bytes. Tunable via `SanitizerConfig::lookback_window`.
pub const DEFAULT_LOOKBACK_WINDOW: usize = 500;

/// A quote is a string boundary only if preceded by an even number of
/// consecutive backslashes. The count stops at `floor`, so a backslash run
/// crossing the window edge is undercounted (part of the window limitation).
fn quote_is_boundary(bytes: &[u8], pos: usize, floor: usize) -> bool {
    let mut backslashes = 0usize;
    let mut i = pos;
    while i > floor && bytes[i - 1] == b'\\' {
        backslashes += 1;
        i -= 1;
    }
    backslashes % 2 == 0
}

/// Whether `offset` falls inside a string literal.
///
/// Counts boundary quotes between `offset` and the window floor; odd parity
/// means the offset is inside an unclosed quote pair.
pub fn is_in_string(text: &str, offset: usize, window: usize) -> bool {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());
    let floor = offset.saturating_sub(window);
    let mut quotes = 0usize;
    let mut i = offset;
    while i > floor {
        i -= 1;
        if bytes[i] == b'"' && quote_is_boundary(bytes, i, floor) {
            quotes += 1;
        }
    }
    quotes % 2 == 1
}

/// Whether any enclosing container at `offset` is an array.
pub fn is_in_array(text: &str, offset: usize, window: usize) -> bool {
    enclosing_containers(text, offset, window).0
}

/// Whether the nearest enclosing container at `offset` is an array.
///
/// Returns true the first time the backward walk meets an unmatched `[` with
/// zero outstanding brace debt; an unmatched `{` met first settles the answer
/// to false (the offset sits directly in an object).
pub fn is_directly_in_array(text: &str, offset: usize, window: usize) -> bool {
    enclosing_containers(text, offset, window).1
}

fn enclosing_containers(text: &str, offset: usize, window: usize) -> (bool, bool) {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());
    let floor = offset.saturating_sub(window);

    let mut inside_string = is_in_string(text, offset, window);
    let mut bracket_debt = 0usize;
    let mut brace_debt = 0usize;
    let mut in_array = false;
    let mut directly: Option<bool> = None;

    let mut i = offset;
    while i > floor {
        i -= 1;
        let b = bytes[i];
        if b == b'"' && quote_is_boundary(bytes, i, floor) {
            inside_string = !inside_string;
            continue;
        }
        if inside_string {
            continue;
        }
        match b {
            b']' => bracket_debt += 1,
            b'}' => brace_debt += 1,
            b'[' => {
                if bracket_debt > 0 {
                    bracket_debt -= 1;
                } else {
                    // Any unmatched '[' answers both queries.
                    if directly.is_none() {
                        directly = Some(brace_debt == 0);
                    }
                    in_array = true;
                    break;
                }
            }
            b'{' => {
                if brace_debt > 0 {
                    brace_debt -= 1;
                } else if directly.is_none() {
                    directly = Some(false);
                }
            }
            _ => {}
        }
    }
    (in_array, directly.unwrap_or(false))
}

/// Interior span of a double-quoted string literal found by a forward scan.
/// `start` is the first content byte, `end` is exclusive of the closing quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSpan {
    pub start: usize,
    pub end: usize,
    pub closed: bool,
}

/// Forward scan of the whole text collecting every double-quoted string span,
/// escape-aware. Strategies that rewrite string interiors (or their
/// complement) iterate these spans instead of re-deriving boundaries.
pub fn string_spans(text: &str) -> Vec<StringSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'"' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut j = start;
        let mut escape = false;
        let mut closed = false;
        while j < bytes.len() {
            let b = bytes[j];
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                closed = true;
                break;
            }
            j += 1;
        }
        spans.push(StringSpan {
            start,
            end: j,
            closed,
        });
        i = if closed { j + 1 } else { j };
    }
    spans
}

/// Span of the string literal whose opening quote sits at `open`, if any.
pub fn string_span_at(text: &str, open: usize) -> Option<StringSpan> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'"') {
        return None;
    }
    let start = open + 1;
    let mut j = start;
    let mut escape = false;
    let mut closed = false;
    while j < bytes.len() {
        let b = bytes[j];
        if escape {
            escape = false;
        } else if b == b'\\' {
            escape = true;
        } else if b == b'"' {
            closed = true;
            break;
        }
        j += 1;
    }
    Some(StringSpan {
        start,
        end: j,
        closed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = DEFAULT_LOOKBACK_WINDOW;

    #[test]
    fn string_detection_basic() {
        let text = r#"{"name": "wid|get"}"#;
        let bar = text.find('|').unwrap();
        assert!(is_in_string(text, bar, W));
        assert!(!is_in_string(text, text.find(':').unwrap(), W));
    }

    #[test]
    fn escaped_quote_is_not_a_boundary() {
        let text = r#"{"a": "say \"hi\" now"}"#;
        let offset = text.find("now").unwrap();
        assert!(is_in_string(text, offset, W));
    }

    #[test]
    fn even_backslash_run_keeps_boundary() {
        // "c:\\" is a closed string; the offset after it is outside.
        let text = r#"{"p": "c:\\", "q": 1}"#;
        let offset = text.find("\"q\"").unwrap();
        assert!(!is_in_string(text, offset, W));
    }

    #[test]
    fn array_detection() {
        let text = r#"{"items": [1, 2, |3]}"#;
        let bar = text.find('|').unwrap();
        assert!(is_in_array(text, bar, W));
        assert!(is_directly_in_array(text, bar, W));
    }

    #[test]
    fn object_inside_array_is_not_directly_in_array() {
        let text = r#"{"items": [{"a": |1}]}"#;
        let bar = text.find('|').unwrap();
        assert!(is_in_array(text, bar, W));
        assert!(!is_directly_in_array(text, bar, W));
    }

    #[test]
    fn object_context_is_not_array() {
        let text = r#"{"a": {"b": |1}}"#;
        let bar = text.find('|').unwrap();
        assert!(!is_in_array(text, bar, W));
        assert!(!is_directly_in_array(text, bar, W));
    }

    #[test]
    fn closed_array_before_offset_leaves_debt_balanced() {
        let text = r#"{"a": [1, 2], "b": |3}"#;
        let bar = text.find('|').unwrap();
        assert!(!is_in_array(text, bar, W));
    }

    #[test]
    fn quotes_inside_strings_do_not_leak_brackets() {
        let text = r#"{"a": "[[[", "b": |1}"#;
        let bar = text.find('|').unwrap();
        assert!(!is_in_array(text, bar, W));
    }

    // Boundary condition, not a bug: a single string literal longer than the
    // window is misclassified because the opening quote falls outside the
    // backward scan. Widening the window trades quadratic scan cost for
    // correctness on such lines; the window stays tunable instead.
    #[test]
    fn window_shorter_than_string_misclassifies() {
        let mut text = String::from(r#"{"k": ""#);
        text.push_str(&"a".repeat(600));
        let offset = text.len();
        assert!(!is_in_string(&text, offset, 500));
        assert!(is_in_string(&text, offset, 1000));
    }

    #[test]
    fn string_spans_cover_escapes_and_truncation() {
        let spans = string_spans(r#"{"a": "x\"y", "b": "open"#);
        assert_eq!(spans.len(), 4);
        assert!(spans[0].closed); // a
        assert!(spans[1].closed); // x\"y
        assert!(spans[2].closed); // b
        assert!(!spans[3].closed); // open
    }
}
