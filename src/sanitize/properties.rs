//! Property-name repair: concatenated fragments, missing quotes, corrupted
//! names resolved through the matcher, underscore damage, embedded value
//! fragments, and caller-supplied rules.

use crate::diagnostics::DiagnosticLog;
use crate::matcher::match_property;
use crate::sanitize::{apply_edits, finish, next_significant, Edit};
use crate::scanner;
use crate::types::{SanitizerConfig, StrategyResult};

/// A quoted key occurrence: `text[start..end]` is the key content, `colon`
/// the byte offset of the separator that follows it.
pub(crate) struct KeySite {
    pub(crate) open: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) colon: usize,
}

/// Enumerate quoted object keys: a closed string whose previous significant
/// byte is `{` or `,` (or start of text) and whose next significant byte is
/// `:`.
pub(crate) fn key_sites(text: &str) -> Vec<KeySite> {
    let bytes = text.as_bytes();
    let mut sites = Vec::new();
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
        let mut j = i + 1;
        let mut escape = false;
        let mut closed = false;
        while j < bytes.len() {
            let c = bytes[j];
            if escape {
                escape = false;
            } else if c == b'\\' {
                escape = true;
            } else if c == b'"' {
                closed = true;
                break;
            }
            j += 1;
        }
        if !closed {
            break;
        }
        if matches!(last_sig, None | Some(b'{') | Some(b',')) {
            if let Some((colon, b':')) = next_significant(bytes, j + 1) {
                sites.push(KeySite {
                    open,
                    start: open + 1,
                    end: j,
                    colon,
                });
            }
        }
        last_sig = Some(b'"');
        i = j + 1;
    }
    sites
}

fn parse_string_content(bytes: &[u8], open: usize) -> Option<(usize, usize)> {
    if bytes.get(open) != Some(&b'"') {
        return None;
    }
    let mut j = open + 1;
    let mut escape = false;
    while j < bytes.len() {
        let c = bytes[j];
        if escape {
            escape = false;
        } else if c == b'\\' {
            escape = true;
        } else if c == b'"' {
            return Some((open + 1, j));
        }
        j += 1;
    }
    None
}

/// Merge artificially concatenated key fragments: `"na" + "me":` and the
/// bare-adjacency form `"na" "me":` both become `"name":`.
pub fn merge_concatenated_key_fragments(text: &str, config: &SanitizerConfig) -> StrategyResult {
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
        let key_position = matches!(last_sig, None | Some(b'{') | Some(b','));
        let first = match parse_string_content(bytes, i) {
            Some(span) => span,
            None => break,
        };
        if !key_position {
            last_sig = Some(b'"');
            i = first.1 + 1;
            continue;
        }

        let mut merged = text[first.0..first.1].to_string();
        let mut fragments = 1usize;
        let mut cursor = first.1 + 1;
        loop {
            let (pos, c) = match next_significant(bytes, cursor) {
                Some(found) => found,
                None => break,
            };
            let frag_open = match c {
                b'+' => match next_significant(bytes, pos + 1) {
                    Some((qpos, b'"')) => qpos,
                    _ => break,
                },
                b'"' => pos,
                _ => break,
            };
            let frag = match parse_string_content(bytes, frag_open) {
                Some(span) => span,
                None => break,
            };
            merged.push_str(&text[frag.0..frag.1]);
            fragments += 1;
            cursor = frag.1 + 1;
        }

        let followed_by_colon =
            matches!(next_significant(bytes, cursor), Some((_, b':')));
        if fragments >= 2 && followed_by_colon {
            edits.push(Edit {
                start: i,
                end: cursor,
                replacement: format!("\"{merged}\""),
            });
            log.push(format!(
                "merged {fragments} concatenated key fragments into \"{merged}\" at byte {i}"
            ));
            last_sig = Some(b'"');
            i = cursor;
            continue;
        }
        last_sig = Some(b'"');
        i = first.1 + 1;
    }
    finish(text, apply_edits(text, &edits), log)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Add the missing opening quote on keys like `name": 1`, and quote fully
/// unquoted keys like `name: 1`.
pub fn add_missing_key_quotes(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_sig: Option<u8> = None;
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
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
            i += 1;
            continue;
        }
        let key_position = matches!(last_sig, None | Some(b'{') | Some(b','));
        if key_position && is_ident_start(b) {
            let start = i;
            let mut end = i + 1;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            let ident = &text[start..end];
            if bytes.get(end) == Some(&b'"') {
                // `name":` — the closing quote survived, the opener did not.
                if let Some((colon, b':')) = next_significant(bytes, end + 1) {
                    edits.push(Edit {
                        start,
                        end: start,
                        replacement: "\"".to_string(),
                    });
                    log.push(format!(
                        "added missing opening quote on key \"{ident}\" at byte {start}"
                    ));
                    last_sig = Some(b':');
                    i = colon + 1;
                    continue;
                }
            }
            if let Some((colon, b':')) = next_significant(bytes, end) {
                edits.push(Edit {
                    start,
                    end,
                    replacement: format!("\"{ident}\""),
                });
                log.push(format!("quoted bare key \"{ident}\" at byte {start}"));
                last_sig = Some(b':');
                i = colon + 1;
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

/// Collapse doubled underscores and strip trailing ones from keys, when the
/// cleaned name is a known property (or no property list was supplied).
pub fn strip_key_underscores(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    for site in key_sites(text) {
        let key = &text[site.start..site.end];
        if key.is_empty() || config.is_known_property(key) {
            continue;
        }
        let mut cleaned = key.to_string();
        while cleaned.contains("__") {
            cleaned = cleaned.replace("__", "_");
        }
        let cleaned = cleaned.trim_end_matches('_').to_string();
        if cleaned == key || cleaned.is_empty() {
            continue;
        }
        let acceptable =
            config.known_properties.is_empty() || config.is_known_property(&cleaned);
        if !acceptable {
            continue;
        }
        log.push(format!(
            "cleaned underscore damage on key \"{key}\" -> \"{cleaned}\""
        ));
        edits.push(Edit {
            start: site.start,
            end: site.end,
            replacement: cleaned,
        });
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Resolve truncated or typo'd keys. Legacy exact-match maps are consulted
/// first; the matcher cascade decides the rest, gated on
/// `min_match_confidence`.
pub fn repair_corrupted_property_names(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    for site in key_sites(text) {
        let key = &text[site.start..site.end];
        if key.is_empty() || key.contains('\\') || config.is_known_property(key) {
            continue;
        }

        if let Some(full) = config.truncation_map.get(key) {
            if full != key {
                log.push(format!(
                    "expanded truncated key \"{key}\" to \"{full}\" via legacy map"
                ));
                edits.push(Edit {
                    start: site.start,
                    end: site.end,
                    replacement: full.clone(),
                });
            }
            continue;
        }
        if let Some(fixed) = config.typo_map.get(key) {
            if fixed != key {
                log.push(format!(
                    "corrected key typo \"{key}\" to \"{fixed}\" via legacy map"
                ));
                edits.push(Edit {
                    start: site.start,
                    end: site.end,
                    replacement: fixed.clone(),
                });
            }
            continue;
        }
        if let Some((bad, good)) = config
            .prefix_map
            .iter()
            .find(|(bad, _)| !bad.is_empty() && key.starts_with(bad.as_str()))
        {
            let fixed = format!("{good}{}", &key[bad.len()..]);
            if fixed != key {
                log.push(format!(
                    "repaired corrupted key prefix \"{key}\" -> \"{fixed}\""
                ));
                edits.push(Edit {
                    start: site.start,
                    end: site.end,
                    replacement: fixed,
                });
            }
            continue;
        }

        let m = match_property(key, &config.known_properties, config);
        // Without schema metadata the cascade runs against the built-in
        // common-name pool; demand near-certainty before rewriting on that
        // weaker evidence.
        let required = if config.known_properties.is_empty() {
            config.min_match_confidence.max(0.9)
        } else {
            config.min_match_confidence
        };
        if let Some(name) = m.matched {
            if m.confidence >= required && name != key {
                log.push(format!(
                    "resolved corrupted key \"{key}\" to \"{name}\" ({:?}, confidence {:.2})",
                    m.match_type, m.confidence
                ));
                edits.push(Edit {
                    start: site.start,
                    end: site.end,
                    replacement: name,
                });
            }
        }
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Fix keys with an accidentally embedded value fragment:
/// `"name foo": "foo"` becomes `"name": "foo"`.
pub fn split_embedded_value_keys(text: &str, config: &SanitizerConfig) -> StrategyResult {
    let bytes = text.as_bytes();
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut edits: Vec<Edit> = Vec::new();
    for site in key_sites(text) {
        let key = &text[site.start..site.end];
        let (first, rest) = match key.split_once(' ') {
            Some(parts) => parts,
            None => continue,
        };
        if first.is_empty() || rest.is_empty() {
            continue;
        }
        if !first.bytes().next().map(is_ident_start).unwrap_or(false)
            || !first.bytes().all(is_ident_byte)
        {
            continue;
        }
        let accepted = config.known_properties.is_empty() || config.is_known_property(first);
        if !accepted {
            continue;
        }
        let value_open = match next_significant(bytes, site.colon + 1) {
            Some((pos, b'"')) => pos,
            _ => continue,
        };
        let value = match parse_string_content(bytes, value_open) {
            Some((s, e)) => &text[s..e],
            None => continue,
        };
        if value != rest && !value.starts_with(rest) {
            continue;
        }
        log.push(format!(
            "dropped embedded value fragment from key \"{key}\" -> \"{first}\""
        ));
        edits.push(Edit {
            start: site.start,
            end: site.end,
            replacement: first.to_string(),
        });
    }
    finish(text, apply_edits(text, &edits), log)
}

/// Apply caller-supplied literal replacement rules, outside strings only.
pub fn apply_extra_rules(text: &str, config: &SanitizerConfig) -> StrategyResult {
    if config.extra_rules.is_empty() {
        return StrategyResult::unchanged(text);
    }
    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut current = text.to_string();
    for rule in &config.extra_rules {
        if rule.find.is_empty() {
            continue;
        }
        let mut edits: Vec<Edit> = Vec::new();
        let mut from = 0usize;
        while let Some(rel) = current[from..].find(&rule.find) {
            let at = from + rel;
            if !scanner::is_in_string(&current, at, config.lookback_window) {
                edits.push(Edit {
                    start: at,
                    end: at + rule.find.len(),
                    replacement: rule.replace.clone(),
                });
                log.push(format!("applied rule \"{}\" at byte {at}", rule.label));
            }
            from = at + rule.find.len();
        }
        if !edits.is_empty() {
            current = apply_edits(&current, &edits);
        }
    }
    finish(text, current, log)
}
