use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProcessError;
use crate::scanner::DEFAULT_LOOKBACK_WINDOW;
use crate::schema::TargetSchema;

/// A caller-supplied literal replacement, applied outside string literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub find: String,
    pub replace: String,
    /// Short label used in the mutation step when the rule fires.
    pub label: String,
}

/// Immutable configuration for one processing call.
///
/// Built once per schema/target (usually via [`SanitizerConfig::for_schema`])
/// and passed by shared reference into every strategy; never mutated
/// mid-pipeline, so one instance is safe to share across concurrent calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Valid field names for the target schema, in declaration order.
    pub known_properties: Vec<String>,
    /// Fields declared numeric by the schema; drives post-parse coercion.
    pub numeric_properties: Vec<String>,
    /// Fields declared as arrays by the schema.
    pub array_properties: Vec<String>,
    /// Legacy exact-match fallbacks: truncated key -> full name.
    pub truncation_map: HashMap<String, String>,
    /// Legacy exact-match fallbacks: known typo -> correction.
    pub typo_map: HashMap<String, String>,
    /// Legacy fallbacks: corrupted prefix -> fixed prefix.
    pub prefix_map: HashMap<String, String>,
    /// Caller-supplied extra rules, run as their own pipeline slot.
    pub extra_rules: Vec<ReplacementRule>,

    /// Backward scan budget for lexical context queries, in bytes.
    pub lookback_window: usize,
    /// Minimum fragment length for fuzzy matching.
    pub min_fuzzy_len: usize,
    /// Minimum fragment length for contains matching.
    pub min_contains_len: usize,
    /// Edit-distance threshold for fragments shorter than 6 characters.
    pub fuzzy_base_threshold: usize,
    /// Matcher confidence required before a key is rewritten.
    pub min_match_confidence: f64,

    /// Stored diagnostics per strategy; repairs past this are counted only.
    pub max_diagnostics_per_strategy: usize,
    /// Stored diagnostics across the whole run.
    pub max_total_diagnostics: usize,
    /// Iteration cap for strategies that re-run to a fixed point.
    pub max_pass_iterations: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            known_properties: Vec::new(),
            numeric_properties: Vec::new(),
            array_properties: Vec::new(),
            truncation_map: HashMap::new(),
            typo_map: HashMap::new(),
            prefix_map: HashMap::new(),
            extra_rules: Vec::new(),
            lookback_window: DEFAULT_LOOKBACK_WINDOW,
            min_fuzzy_len: 4,
            min_contains_len: 4,
            fuzzy_base_threshold: 2,
            min_match_confidence: 0.7,
            max_diagnostics_per_strategy: 20,
            max_total_diagnostics: 200,
            max_pass_iterations: 24,
        }
    }
}

impl SanitizerConfig {
    /// Derive a config from the metadata of the target schema.
    pub fn for_schema(schema: &TargetSchema) -> Self {
        let meta = schema.metadata();
        Self {
            known_properties: meta.known_properties.clone(),
            numeric_properties: meta.numeric_properties.clone(),
            array_properties: meta.array_properties.clone(),
            ..Self::default()
        }
    }

    pub fn is_known_property(&self, name: &str) -> bool {
        self.known_properties
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}

/// Outcome of a single repair strategy over the whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub content: String,
    pub changed: bool,
    /// Bounded by `max_diagnostics_per_strategy`.
    pub diagnostics: Vec<String>,
}

impl StrategyResult {
    pub fn unchanged(text: &str) -> Self {
        Self {
            content: text.to_string(),
            changed: false,
            diagnostics: Vec::new(),
        }
    }
}

/// Caller-side request metadata handed to the failure sink on `Failure`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub model: Option<String>,
    pub target: Option<String>,
}

/// Final outcome of one processing call. The ordered diagnostic trail is
/// present on both arms so callers can tell "came back clean" from
/// "silently repaired" even on success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingResult {
    Success {
        data: Value,
        mutation_steps: Vec<String>,
    },
    Failure {
        error: ProcessError,
        mutation_steps: Vec<String>,
    },
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ProcessingResult::Success { data, .. } => Some(data),
            ProcessingResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ProcessError> {
        match self {
            ProcessingResult::Success { .. } => None,
            ProcessingResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn mutation_steps(&self) -> &[String] {
        match self {
            ProcessingResult::Success { mutation_steps, .. } => mutation_steps,
            ProcessingResult::Failure { mutation_steps, .. } => mutation_steps,
        }
    }

    /// True when the call succeeded without a single repair.
    pub fn is_clean(&self) -> bool {
        self.is_success() && self.mutation_steps().is_empty()
    }
}
