//! Schema-aware transforms applied to the parsed value, after text repair
//! and before validation: schema-wrapper unwrapping, numeric coercion, and
//! trimming of structurally incomplete trailing array items.

use serde_json::{Map, Value};

use crate::diagnostics::DiagnosticLog;
use crate::types::SanitizerConfig;

/// Run all post-parse transforms in order. Returned steps are prefixed with
/// the transform that produced them, mirroring the text pipeline.
pub fn apply_post_parse_transforms(
    value: Value,
    config: &SanitizerConfig,
) -> (Value, Vec<String>) {
    let mut steps = Vec::new();

    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    let mut value = unwrap_schema_echo(value, &mut log);
    for entry in log.into_entries() {
        steps.push(format!("unwrap_schema_wrappers: {entry}"));
    }

    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    coerce_numeric_strings(&mut value, &config.numeric_properties, &mut log);
    for entry in log.into_entries() {
        steps.push(format!("coerce_numeric_strings: {entry}"));
    }

    let mut log = DiagnosticLog::new(config.max_diagnostics_per_strategy);
    trim_incomplete_trailing_items(&mut value, &mut log);
    for entry in log.into_entries() {
        steps.push(format!("trim_incomplete_trailing_items: {entry}"));
    }

    (value, steps)
}

fn is_schema_wrapper(v: &Value) -> bool {
    v.get("type").and_then(Value::as_str) == Some("object")
        && v.get("properties")
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty())
}

/// A `{type, description}` definition standing where data should be; the
/// description carries the intended content.
fn is_leaf_definition(v: &Value) -> bool {
    match v.as_object() {
        Some(map) => {
            map.len() <= 3
                && map.contains_key("type")
                && map.contains_key("description")
        }
        None => false,
    }
}

/// Replace a schema-shaped wrapper object (`type: "object"` with non-empty
/// `properties`) by the contents of its `properties`, recursively. This
/// corrects the failure mode where the model echoes the schema instead of
/// producing data.
pub fn unwrap_schema_echo(value: Value, log: &mut DiagnosticLog) -> Value {
    if is_schema_wrapper(&value) {
        log.push("unwrapped schema-shaped wrapper object into its properties".to_string());
        let props = match value {
            Value::Object(mut map) => map.remove("properties").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if let Value::Object(props) = props {
            let mut out = Map::new();
            for (name, sub) in props {
                if is_leaf_definition(&sub) {
                    log.push(format!(
                        "unwrapped leaf definition for \"{name}\" into its description"
                    ));
                    let desc = sub.get("description").cloned().unwrap_or(Value::Null);
                    out.insert(name, desc);
                } else {
                    out.insert(name, unwrap_schema_echo(sub, log));
                }
            }
            return Value::Object(out);
        }
        return props;
    }
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, unwrap_schema_echo(v, log)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| unwrap_schema_echo(v, log))
                .collect(),
        ),
        other => other,
    }
}

/// Pull the leading or first embedded number out of a string like
/// `"150 items"` or `"about 3.5"`.
fn extract_number(s: &str) -> Option<Value> {
    let t = s.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = t.parse::<f64>() {
        return serde_json::Number::from_f64(f).map(Value::Number);
    }
    let bytes = t.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            start = Some(if i > 0 && bytes[i - 1] == b'-' { i - 1 } else { i });
            break;
        }
    }
    let start = start?;
    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_digit() || (b == b'-' && end == start) {
            end += 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    let token = t[start..end].trim_end_matches('.');
    if let Ok(i) = token.parse::<i64>() {
        return Some(Value::from(i));
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// For fields the schema declares numeric, convert string values to numbers,
/// recursively at any nesting depth.
pub fn coerce_numeric_strings(value: &mut Value, numeric: &[String], log: &mut DiagnosticLog) {
    if numeric.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if numeric.iter().any(|n| n.eq_ignore_ascii_case(key)) {
                    if let Value::String(s) = v {
                        if let Some(n) = extract_number(s) {
                            log.push(format!(
                                "coerced \"{s}\" to {n} for numeric field \"{key}\""
                            ));
                            *v = n;
                            continue;
                        }
                    }
                }
                coerce_numeric_strings(v, numeric, log);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                coerce_numeric_strings(v, numeric, log);
            }
        }
        _ => {}
    }
}

/// Drop a trailing array item that is structurally incomplete relative to
/// its siblings: in an array of plain objects with at least two items, the
/// last item goes when its property count is below half the average of the
/// preceding items and short by at least two properties. This is the shape
/// of a final element cut off by a token limit.
pub fn trim_incomplete_trailing_items(value: &mut Value, log: &mut DiagnosticLog) {
    match value {
        Value::Array(items) => {
            for v in items.iter_mut() {
                trim_incomplete_trailing_items(v, log);
            }
            if items.len() < 2 || !items.iter().all(Value::is_object) {
                return;
            }
            let counts: Vec<usize> = items
                .iter()
                .map(|v| v.as_object().map(Map::len).unwrap_or(0))
                .collect();
            let last = counts[counts.len() - 1] as f64;
            let rest = &counts[..counts.len() - 1];
            let avg = rest.iter().sum::<usize>() as f64 / rest.len() as f64;
            if last < avg / 2.0 && avg - last >= 2.0 {
                log.push(format!(
                    "dropped incomplete trailing array item ({} properties vs average {avg:.1})",
                    last as usize
                ));
                items.pop();
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                trim_incomplete_trailing_items(v, log);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log() -> DiagnosticLog {
        DiagnosticLog::new(20)
    }

    #[test]
    fn schema_echo_unwrapped_to_data() {
        let echoed = json!({
            "type": "object",
            "properties": {
                "purpose": {"type": "string", "description": "Parses input"}
            }
        });
        let mut l = log();
        let out = unwrap_schema_echo(echoed, &mut l);
        assert_eq!(out, json!({"purpose": "Parses input"}));
        assert!(!l.is_empty());
    }

    #[test]
    fn nested_wrapper_unwrapped_recursively() {
        let echoed = json!({
            "type": "object",
            "properties": {
                "inner": {
                    "type": "object",
                    "properties": {
                        "note": {"type": "string", "description": "hi"}
                    }
                }
            }
        });
        let mut l = log();
        let out = unwrap_schema_echo(echoed, &mut l);
        assert_eq!(out, json!({"inner": {"note": "hi"}}));
    }

    #[test]
    fn real_data_left_alone() {
        let data = json!({"type": "object", "name": "not a schema"});
        let mut l = log();
        let out = unwrap_schema_echo(data.clone(), &mut l);
        assert_eq!(out, data);
        assert!(l.is_empty());
    }

    #[test]
    fn numeric_strings_coerced() {
        let mut value = json!({"count": "150 items", "score": "3.5", "name": "x"});
        let numeric = vec!["count".to_string(), "score".to_string()];
        let mut l = log();
        coerce_numeric_strings(&mut value, &numeric, &mut l);
        assert_eq!(value, json!({"count": 150, "score": 3.5, "name": "x"}));
        assert_eq!(l.applied(), 2);
    }

    #[test]
    fn coercion_recurses_into_nesting() {
        let mut value = json!({"outer": [{"count": "7"}]});
        let numeric = vec!["count".to_string()];
        let mut l = log();
        coerce_numeric_strings(&mut value, &numeric, &mut l);
        assert_eq!(value, json!({"outer": [{"count": 7}]}));
    }

    #[test]
    fn non_numeric_string_left_alone() {
        let mut value = json!({"count": "many"});
        let numeric = vec!["count".to_string()];
        let mut l = log();
        coerce_numeric_strings(&mut value, &numeric, &mut l);
        assert_eq!(value, json!({"count": "many"}));
        assert!(l.is_empty());
    }

    #[test]
    fn incomplete_trailing_item_dropped() {
        let mut value = json!([
            {"name": "a", "value": 1, "note": "x"},
            {"name": "b", "value": 2, "note": "y"},
            {"name": "c"}
        ]);
        let mut l = log();
        trim_incomplete_trailing_items(&mut value, &mut l);
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert!(!l.is_empty());
    }

    #[test]
    fn complete_trailing_item_kept() {
        let mut value = json!([
            {"name": "a", "value": 1},
            {"name": "b", "value": 2}
        ]);
        let mut l = log();
        trim_incomplete_trailing_items(&mut value, &mut l);
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert!(l.is_empty());
    }

    #[test]
    fn mixed_arrays_not_trimmed() {
        let mut value = json!([{"a": 1, "b": 2, "c": 3}, {"a": 1, "b": 2, "c": 3}, 5]);
        let mut l = log();
        trim_incomplete_trailing_items(&mut value, &mut l);
        assert_eq!(value.as_array().map(Vec::len), Some(3));
    }
}
