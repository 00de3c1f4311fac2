//! The repair pipeline: an ordered table of independent text-rewrite
//! strategies.
//!
//! Each strategy is a pure function `(text, &SanitizerConfig) ->
//! StrategyResult` targeting one class of malformation. No strategy assumes
//! any other has or has not already run; the table below is the only
//! sequencing contract. Two orderings are load-bearing enough to be pinned by
//! regression tests:
//!
//! - `remove_duplicate_array_entries` runs before
//!   `insert_missing_array_commas`, otherwise a partial re-attempt at the
//!   previous element would be stitched in as a legitimate sibling;
//! - `convert_single_quoted_strings` runs before `escape_string_controls`,
//!   so control characters inside converted strings still get escaped.
//!
//! Strategies marked `fixed_point` are re-run until they report no change,
//! bounded by `SanitizerConfig::max_pass_iterations`.

pub mod arrays;
pub mod normalize;
pub mod properties;
pub mod stray;
pub mod structural;
pub mod syntax;

use tracing::trace;

use crate::diagnostics::DiagnosticLog;
use crate::types::{SanitizerConfig, StrategyResult};

pub type StrategyFn = fn(&str, &SanitizerConfig) -> StrategyResult;

pub struct Strategy {
    pub name: &'static str,
    pub run: StrategyFn,
    pub fixed_point: bool,
}

const fn pass(name: &'static str, run: StrategyFn) -> Strategy {
    Strategy {
        name,
        run,
        fixed_point: false,
    }
}

const fn looping(name: &'static str, run: StrategyFn) -> Strategy {
    Strategy {
        name,
        run,
        fixed_point: true,
    }
}

/// The declared pipeline order. Each strategy receives the output of the
/// previous one.
pub const STRATEGIES: &[Strategy] = &[
    pass("normalize_smart_quotes", normalize::normalize_smart_quotes),
    pass(
        "strip_control_outside_strings",
        normalize::strip_control_outside_strings,
    ),
    pass("strip_comments", syntax::strip_comments),
    pass("normalize_literal_tokens", syntax::normalize_literal_tokens),
    pass("normalize_key_separators", syntax::normalize_key_separators),
    pass(
        "convert_single_quoted_strings",
        syntax::convert_single_quoted_strings,
    ),
    pass("escape_string_controls", normalize::escape_string_controls),
    pass("reduce_over_escaping", normalize::reduce_over_escaping),
    looping("quote_unquoted_values", syntax::quote_unquoted_values),
    looping(
        "merge_concatenated_key_fragments",
        properties::merge_concatenated_key_fragments,
    ),
    pass("add_missing_key_quotes", properties::add_missing_key_quotes),
    pass("strip_key_underscores", properties::strip_key_underscores),
    pass(
        "repair_corrupted_property_names",
        properties::repair_corrupted_property_names,
    ),
    pass(
        "split_embedded_value_keys",
        properties::split_embedded_value_keys,
    ),
    pass("apply_extra_rules", properties::apply_extra_rules),
    pass(
        "replace_corrupted_array_tokens",
        arrays::replace_corrupted_array_tokens,
    ),
    pass("strip_array_leadin_words", arrays::strip_array_leadin_words),
    pass("quote_bare_array_elements", arrays::quote_bare_array_elements),
    looping(
        "remove_duplicate_array_entries",
        arrays::remove_duplicate_array_entries,
    ),
    pass(
        "insert_missing_array_commas",
        arrays::insert_missing_array_commas,
    ),
    pass("remove_stray_commentary", stray::remove_stray_commentary),
    looping("remove_artifact_properties", stray::remove_artifact_properties),
    pass(
        "insert_null_for_dangling_keys",
        structural::insert_null_for_dangling_keys,
    ),
    looping(
        "split_truncated_array_objects",
        structural::split_truncated_array_objects,
    ),
    pass(
        "remove_glued_delimiter_tokens",
        structural::remove_glued_delimiter_tokens,
    ),
    pass("remove_trailing_commas", syntax::remove_trailing_commas),
    pass(
        "close_unterminated_structures",
        syntax::close_unterminated_structures,
    ),
];

fn run_strategy(strategy: &Strategy, text: &str, config: &SanitizerConfig) -> StrategyResult {
    let mut result = (strategy.run)(text, config);
    if !strategy.fixed_point || !result.changed {
        return result;
    }
    let mut iterations = 1usize;
    while iterations < config.max_pass_iterations {
        let next = (strategy.run)(&result.content, config);
        if !next.changed {
            break;
        }
        result.content = next.content;
        for d in next.diagnostics {
            if result.diagnostics.len() < config.max_diagnostics_per_strategy {
                result.diagnostics.push(d);
            }
        }
        iterations += 1;
    }
    result
}

/// Run the full strategy table over `text`. Returns the repaired text and the
/// accumulated mutation steps, each prefixed with the strategy that produced
/// it.
pub fn sanitize(text: &str, config: &SanitizerConfig) -> (String, Vec<String>) {
    let mut current = text.to_string();
    let mut steps = Vec::new();
    for strategy in STRATEGIES {
        let result = run_strategy(strategy, &current, config);
        if result.changed {
            trace!(
                strategy = strategy.name,
                repairs = result.diagnostics.len(),
                "strategy applied"
            );
            for d in &result.diagnostics {
                steps.push(format!("{}: {}", strategy.name, d));
            }
            current = result.content;
        }
    }
    (current, steps)
}

// ---------------------------------------------------------------------------
// Shared helpers for strategies
// ---------------------------------------------------------------------------

/// A pending rewrite of `text[start..end]` with `replacement`.
#[derive(Debug, Clone)]
pub(crate) struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// Apply non-overlapping edits. Edits must be sorted by start offset.
pub(crate) fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for edit in edits {
        if edit.start < cursor {
            continue; // overlapping edit, first writer wins
        }
        out.push_str(&text[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Last non-whitespace byte before `pos`, if any.
pub(crate) fn prev_significant(bytes: &[u8], pos: usize) -> Option<u8> {
    let mut i = pos;
    while i > 0 {
        i -= 1;
        if !bytes[i].is_ascii_whitespace() {
            return Some(bytes[i]);
        }
    }
    None
}

/// First non-whitespace byte at or after `pos`, with its offset.
pub(crate) fn next_significant(bytes: &[u8], pos: usize) -> Option<(usize, u8)> {
    let mut i = pos;
    while i < bytes.len() {
        if !bytes[i].is_ascii_whitespace() {
            return Some((i, bytes[i]));
        }
        i += 1;
    }
    None
}

/// Package a rewrite into a `StrategyResult`, reporting `changed` only when
/// the text actually differs.
pub(crate) fn finish(original: &str, content: String, log: DiagnosticLog) -> StrategyResult {
    if content == original {
        return StrategyResult::unchanged(original);
    }
    StrategyResult {
        content,
        changed: true,
        diagnostics: log.into_entries(),
    }
}
