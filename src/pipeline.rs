//! The processing orchestrator: extract -> sanitize -> parse -> transform ->
//! validate, with exactly one failure exit per stage and no backtracking.
//! Every stage contributes to the mutation-step trail, which is returned on
//! both success and failure so callers can tell a clean response from a
//! silently repaired one.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::extract::extract_payload;
use crate::sanitize::sanitize;
use crate::schema::TargetSchema;
use crate::transform::apply_post_parse_transforms;
use crate::types::{ProcessingResult, RequestContext, SanitizerConfig};

/// Collaborator notified on terminal failure with the raw text, the full
/// diagnostic trail, and the caller's request context, for offline
/// inspection.
pub trait FailureSink {
    fn record(&self, raw_text: &str, steps: &[String], context: &RequestContext);
}

/// Default sink: reports failures through `tracing`.
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn record(&self, raw_text: &str, steps: &[String], context: &RequestContext) {
        warn!(
            request_id = context.request_id.as_deref().unwrap_or("-"),
            model = context.model.as_deref().unwrap_or("-"),
            raw_bytes = raw_text.len(),
            repairs_attempted = steps.len(),
            "response could not be recovered"
        );
    }
}

/// Sink that records nothing; used by tests and by callers that handle
/// failures themselves.
pub struct NullFailureSink;

impl FailureSink for NullFailureSink {
    fn record(&self, _raw_text: &str, _steps: &[String], _context: &RequestContext) {}
}

/// Process a raw model completion into schema-valid data.
pub fn process(
    raw_text: &str,
    config: &SanitizerConfig,
    schema: &TargetSchema,
) -> ProcessingResult {
    process_with_sink(
        raw_text,
        config,
        schema,
        &RequestContext::default(),
        &TracingFailureSink,
    )
}

/// Like [`process`], with an explicit request context and failure sink.
pub fn process_with_sink(
    raw_text: &str,
    config: &SanitizerConfig,
    schema: &TargetSchema,
    context: &RequestContext,
    sink: &dyn FailureSink,
) -> ProcessingResult {
    let mut steps: Vec<String> = Vec::new();

    let extraction = extract_payload(raw_text);
    steps.extend(extraction.steps.iter().cloned());
    debug!(
        span_start = extraction.span.0,
        span_end = extraction.span.1,
        truncated = extraction.truncated,
        "extracted payload"
    );

    let (sanitized, sanitize_steps) = sanitize(&extraction.content, config);
    debug!(repairs = sanitize_steps.len(), "sanitization complete");
    steps.extend(sanitize_steps);

    let parsed: Value = match serde_json::from_str(&sanitized) {
        Ok(value) => value,
        Err(e) => {
            let steps = cap_steps(steps, config.max_total_diagnostics);
            warn!(error = %e, "structural parse failed after sanitization");
            sink.record(raw_text, &steps, context);
            return ProcessingResult::Failure {
                error: ProcessError::Parse {
                    offset: byte_offset(&sanitized, e.line(), e.column()),
                    message: e.to_string(),
                },
                mutation_steps: steps,
            };
        }
    };

    let (transformed, transform_steps) = apply_post_parse_transforms(parsed, config);
    steps.extend(transform_steps);

    match schema.validate(&transformed) {
        Ok(()) => {
            let steps = cap_steps(steps, config.max_total_diagnostics);
            debug!(repairs = steps.len(), "response recovered");
            ProcessingResult::Success {
                data: transformed,
                mutation_steps: steps,
            }
        }
        Err(violations) => {
            let steps = cap_steps(steps, config.max_total_diagnostics);
            warn!(violations = violations.len(), "schema validation failed");
            sink.record(raw_text, &steps, context);
            ProcessingResult::Failure {
                error: ProcessError::SchemaValidation { violations },
                mutation_steps: steps,
            }
        }
    }
}

/// Bound the global trail. Later steps are replaced by a single summary line
/// so the result never exceeds the cap.
fn cap_steps(mut steps: Vec<String>, cap: usize) -> Vec<String> {
    if cap > 0 && steps.len() > cap {
        let omitted = steps.len() - (cap - 1);
        steps.truncate(cap - 1);
        steps.push(format!("({omitted} later repair steps omitted)"));
    }
    steps
}

/// Translate serde_json's 1-based line/column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut offset = 0usize;
    for (i, l) in text.split('\n').enumerate() {
        if i + 1 == line {
            return Some(offset + column.saturating_sub(1).min(l.len()));
        }
        offset += l.len() + 1;
    }
    None
}
