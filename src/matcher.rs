//! Best-effort recovery of corrupted property names.
//!
//! Given a fragment pulled out of malformed text and the list of known-valid
//! property names, the matcher runs a cascade of strategies from cheapest to
//! most speculative and reports the first hit with a confidence score. The
//! confidence is informational — callers decide whether to accept a
//! low-confidence guess (see `SanitizerConfig::min_match_confidence`).

use serde::Serialize;
use strsim::damerau_levenshtein;

use crate::types::SanitizerConfig;

/// Fallback candidates used when the caller supplied no known properties.
/// Degrades matching quality instead of failing outright.
const COMMON_PROPERTY_NAMES: &[&str] = &[
    "name",
    "type",
    "value",
    "description",
    "title",
    "id",
    "status",
    "items",
    "data",
    "result",
    "message",
    "content",
    "properties",
];

/// Expansions for 1-2 character fragments, which are too short for any of
/// the scoring strategies to say anything meaningful about.
const COMMON_TRUNCATIONS: &[(&str, &str)] = &[
    ("na", "name"),
    ("ty", "type"),
    ("va", "value"),
    ("de", "description"),
    ("ti", "title"),
    ("st", "status"),
    ("me", "message"),
    ("co", "content"),
    ("re", "result"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefix,
    Suffix,
    Contains,
    Fuzzy,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMatchResult {
    pub matched: Option<String>,
    pub match_type: MatchType,
    pub confidence: f64,
}

impl PropertyMatchResult {
    fn none() -> Self {
        Self {
            matched: None,
            match_type: MatchType::None,
            confidence: 0.0,
        }
    }

    fn found(name: &str, match_type: MatchType, confidence: f64) -> Self {
        Self {
            matched: Some(name.to_string()),
            match_type,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Strip naming-convention separators and case so `user_name`, `userName`
/// and `user-name` all compare equal.
fn normalize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Prefix-style confidence: longer fragments relative to the candidate are
/// more convincing. Capped per strategy.
fn coverage_confidence(fragment_len: usize, candidate_len: usize, cap: f64) -> f64 {
    if candidate_len == 0 {
        return 0.0;
    }
    (fragment_len as f64 / candidate_len as f64 + 0.3).min(cap)
}

/// Edit-distance budget scaled to fragment length: short strings get a fixed
/// base, mid-length strings stay tight, long strings allow ~20% capped at 5.
fn fuzzy_threshold(len: usize, base: usize) -> usize {
    if len < 6 {
        base
    } else if len <= 10 {
        2
    } else {
        (len / 5).min(5)
    }
}

fn match_short_fragment(fragment: &str, known: &[String]) -> PropertyMatchResult {
    let lower = fragment.to_ascii_lowercase();
    for (trunc, full) in COMMON_TRUNCATIONS {
        if *trunc != lower {
            continue;
        }
        let usable = known.is_empty() || known.iter().any(|k| k.eq_ignore_ascii_case(full));
        if usable {
            // A table hit is a truncation, i.e. a prefix relationship.
            return PropertyMatchResult::found(full, MatchType::Prefix, 0.6);
        }
    }
    PropertyMatchResult::none()
}

/// Resolve `fragment` against the known property names.
///
/// Cascade, first success wins: exact, prefix, suffix, normalized
/// identifier, contains, fuzzy. 1-2 character fragments bypass the cascade
/// and consult a static truncation table instead. With an empty `known`
/// list the built-in common-name table is used as the candidate pool.
pub fn match_property(
    fragment: &str,
    known: &[String],
    config: &SanitizerConfig,
) -> PropertyMatchResult {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return PropertyMatchResult::none();
    }
    if fragment.len() <= 2 {
        return match_short_fragment(fragment, known);
    }

    let fallback: Vec<String>;
    let candidates: &[String] = if known.is_empty() {
        fallback = COMMON_PROPERTY_NAMES.iter().map(|s| s.to_string()).collect();
        &fallback
    } else {
        known
    };

    // 1. Exact (case-insensitive).
    for cand in candidates {
        if cand.eq_ignore_ascii_case(fragment) {
            return PropertyMatchResult::found(cand, MatchType::Exact, 1.0);
        }
    }

    let lower = fragment.to_ascii_lowercase();

    // 2. Prefix: the fragment is a truncated head. Shortest candidate wins
    // (the most specific completion).
    let mut best: Option<&String> = None;
    for cand in candidates {
        if cand.len() > fragment.len() && cand.to_ascii_lowercase().starts_with(&lower) {
            match best {
                Some(b) if b.len() <= cand.len() => {}
                _ => best = Some(cand),
            }
        }
    }
    if let Some(cand) = best {
        let conf = coverage_confidence(fragment.len(), cand.len(), 0.9);
        return PropertyMatchResult::found(cand, MatchType::Prefix, conf);
    }

    // 3. Suffix: symmetric, for fragments with a truncated start.
    let mut best: Option<&String> = None;
    for cand in candidates {
        if cand.len() > fragment.len() && cand.to_ascii_lowercase().ends_with(&lower) {
            match best {
                Some(b) if b.len() <= cand.len() => {}
                _ => best = Some(cand),
            }
        }
    }
    if let Some(cand) = best {
        let conf = coverage_confidence(fragment.len(), cand.len(), 0.85);
        return PropertyMatchResult::found(cand, MatchType::Suffix, conf);
    }

    // 4. Normalized identifier: bridge camelCase/snake_case/kebab-case drift.
    let norm_fragment = normalize_identifier(fragment);
    if !norm_fragment.is_empty() {
        for cand in candidates {
            if normalize_identifier(cand) == norm_fragment {
                return PropertyMatchResult::found(cand, MatchType::Exact, 0.9);
            }
        }
        let mut best: Option<(&String, String)> = None;
        for cand in candidates {
            let norm_cand = normalize_identifier(cand);
            if norm_cand.len() > norm_fragment.len() && norm_cand.starts_with(&norm_fragment) {
                let better = match &best {
                    Some((b, _)) => cand.len() < b.len(),
                    None => true,
                };
                if better {
                    best = Some((cand, norm_cand));
                }
            }
        }
        if let Some((cand, norm_cand)) = best {
            let conf = coverage_confidence(norm_fragment.len(), norm_cand.len(), 0.9);
            return PropertyMatchResult::found(cand, MatchType::Prefix, conf);
        }
    }

    // 5. Contains: the fragment appears strictly inside a candidate.
    if fragment.len() >= config.min_contains_len {
        let mut best: Option<(&String, usize)> = None;
        for cand in candidates {
            let cand_lower = cand.to_ascii_lowercase();
            if let Some(pos) = cand_lower.find(&lower) {
                let strictly_inside = pos > 0 && pos + lower.len() < cand_lower.len();
                if !strictly_inside {
                    continue;
                }
                let better = match &best {
                    Some((b, bpos)) => {
                        cand.len() < b.len() || (cand.len() == b.len() && pos < *bpos)
                    }
                    None => true,
                };
                if better {
                    best = Some((cand, pos));
                }
            }
        }
        if let Some((cand, _)) = best {
            let conf = coverage_confidence(fragment.len(), cand.len(), 0.75);
            return PropertyMatchResult::found(cand, MatchType::Contains, conf);
        }
    }

    // 6. Fuzzy via edit distance, fragments of useful length only.
    if fragment.len() >= config.min_fuzzy_len {
        let threshold = fuzzy_threshold(fragment.len(), config.fuzzy_base_threshold);
        let mut best: Option<(&String, usize)> = None;
        for cand in candidates {
            // Length prefilter: a candidate further away than the threshold
            // in length alone cannot be within distance.
            let len_gap = cand.len().abs_diff(fragment.len());
            if len_gap > threshold {
                continue;
            }
            let distance = damerau_levenshtein(&lower, &cand.to_ascii_lowercase());
            if distance > threshold {
                continue;
            }
            let better = match &best {
                Some((b, bdist)) => {
                    distance < *bdist || (distance == *bdist && cand.len() < b.len())
                }
                None => true,
            };
            if better {
                best = Some((cand, distance));
            }
        }
        if let Some((cand, distance)) = best {
            let denom = fragment.len().max(cand.len()) as f64;
            let conf = (1.0 - distance as f64 / denom).max(0.5);
            return PropertyMatchResult::found(cand, MatchType::Fuzzy, conf);
        }
    }

    PropertyMatchResult::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cfg() -> SanitizerConfig {
        SanitizerConfig::default()
    }

    #[test]
    fn exact_is_case_insensitive() {
        let k = known(&["severity", "fileName"]);
        let m = match_property("FILENAME", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("fileName"));
        assert_eq!(m.match_type, MatchType::Exact);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn prefix_prefers_shortest_candidate() {
        let k = known(&["description", "desc"]);
        let m = match_property("des", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("desc"));
        assert_eq!(m.match_type, MatchType::Prefix);
        assert!(m.confidence <= 0.9);
    }

    #[test]
    fn suffix_handles_truncated_start() {
        let k = known(&["cyclomaticComplexity"]);
        let m = match_property("Complexity", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("cyclomaticComplexity"));
        assert_eq!(m.match_type, MatchType::Suffix);
        assert!(m.confidence <= 0.85);
    }

    #[test]
    fn normalized_bridges_naming_conventions() {
        let k = known(&["fileName"]);
        let m = match_property("file_name", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("fileName"));
        assert_eq!(m.match_type, MatchType::Exact);
        assert!((m.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn contains_requires_strict_interior() {
        let k = known(&["totalLineCount"]);
        let m = match_property("Line", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("totalLineCount"));
        assert_eq!(m.match_type, MatchType::Contains);
        assert!(m.confidence <= 0.75);
    }

    #[test]
    fn fuzzy_recovers_single_typo() {
        let k = known(&["cyclomaticComplexity", "halsteadVolume"]);
        let m = match_property("cyclometicComplexity", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("cyclomaticComplexity"));
        assert_eq!(m.match_type, MatchType::Fuzzy);
        assert!(m.confidence >= 0.5);
    }

    #[test]
    fn fuzzy_skips_too_distant_candidates() {
        let k = known(&["name"]);
        let m = match_property("zzzzzz", &k, &cfg());
        assert_eq!(m.match_type, MatchType::None);
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn short_fragment_uses_truncation_table() {
        let k = known(&["name", "value"]);
        let m = match_property("na", &k, &cfg());
        assert_eq!(m.matched.as_deref(), Some("name"));
        assert_eq!(m.match_type, MatchType::Prefix);
    }

    #[test]
    fn short_fragment_filtered_by_known_properties() {
        let k = known(&["value"]);
        let m = match_property("na", &k, &cfg());
        assert_eq!(m.match_type, MatchType::None);
    }

    #[test]
    fn empty_known_falls_back_to_common_names() {
        let m = match_property("descripton", &[], &cfg());
        assert_eq!(m.matched.as_deref(), Some("description"));
        assert_eq!(m.match_type, MatchType::Fuzzy);
    }

    #[test]
    fn no_match_reports_none() {
        let k = known(&["alpha"]);
        let m = match_property("qqqqqqqq", &k, &cfg());
        assert_eq!(m.matched, None);
        assert_eq!(m.match_type, MatchType::None);
    }
}
