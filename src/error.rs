use serde::Serialize;
use thiserror::Error;

/// Terminal failures of the processing pipeline.
///
/// Recoverable malformations never surface here — they are fixed and recorded
/// as mutation steps. Only the parse and validate stages can fail. A missing
/// or empty property list is not an error either; matching degrades to a
/// built-in common-name table instead.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessError {
    /// Sanitization completed but the result still fails structural parsing.
    #[error("structural parse failed after sanitization: {message}")]
    Parse {
        message: String,
        offset: Option<usize>,
    },

    /// The parsed value does not satisfy the target schema after post-parse
    /// transforms. Surfaced distinctly from `Parse` so callers can pick a
    /// different remediation (retry the model vs. treat as a data-shape bug).
    #[error("schema validation failed: {}", violations.join("; "))]
    SchemaValidation { violations: Vec<String> },
}

impl ProcessError {
    pub fn is_parse(&self) -> bool {
        matches!(self, ProcessError::Parse { .. })
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, ProcessError::SchemaValidation { .. })
    }
}
