//! Target-schema introspection and the structural validation seam.
//!
//! The sanitizer does not validate data itself; it consumes property-name
//! metadata extracted from the target schema (to guide key recovery and
//! numeric coercion) and hands the transformed value to a structural
//! validator. The validator here checks required keys and declared leaf
//! types; a richer engine can be swapped in behind the same seam.

use serde_json::Value;

/// Nesting depth bound for the metadata walk. Schemas deeper than this stop
/// contributing property names rather than recursing without limit.
pub const MAX_SCHEMA_DEPTH: usize = 16;

/// Property-name metadata consumed by the matcher and the post-parse
/// transforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMetadata {
    /// Every property name declared anywhere in the schema, in declaration
    /// order, deduplicated.
    pub known_properties: Vec<String>,
    /// Properties whose declared type is `number` or `integer`.
    pub numeric_properties: Vec<String>,
    /// Properties whose declared type is `array`.
    pub array_properties: Vec<String>,
}

impl SchemaMetadata {
    fn add(list: &mut Vec<String>, name: &str) {
        if !list.iter().any(|n| n == name) {
            list.push(name.to_string());
        }
    }
}

/// A JSON-Schema shaped definition plus the metadata extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSchema {
    root: Value,
    metadata: SchemaMetadata,
}

impl TargetSchema {
    pub fn new(root: Value) -> Self {
        let metadata = extract_metadata(&root, MAX_SCHEMA_DEPTH);
        Self { root, metadata }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        &self.metadata
    }

    /// Structural verdict for a transformed value: required keys present and
    /// declared leaf types respected, recursively. Returns the full list of
    /// violations rather than failing fast so the caller can log all of them.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        check_value(&self.root, value, "$", MAX_SCHEMA_DEPTH, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Walk a JSON-Schema shaped value collecting property names and leaf types.
/// Handles object shapes, array `items`, and `anyOf`/`allOf`/`oneOf`
/// combinators up to `depth` levels.
pub fn extract_metadata(schema: &Value, depth: usize) -> SchemaMetadata {
    let mut meta = SchemaMetadata::default();
    walk_schema(schema, depth, &mut meta);
    meta
}

fn walk_schema(schema: &Value, depth: usize, meta: &mut SchemaMetadata) {
    if depth == 0 {
        return;
    }
    let obj = match schema.as_object() {
        Some(obj) => obj,
        None => return,
    };

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, sub) in props {
            SchemaMetadata::add(&mut meta.known_properties, name);
            match sub.get("type").and_then(Value::as_str) {
                Some("number") | Some("integer") => {
                    SchemaMetadata::add(&mut meta.numeric_properties, name)
                }
                Some("array") => SchemaMetadata::add(&mut meta.array_properties, name),
                _ => {}
            }
            walk_schema(sub, depth - 1, meta);
        }
    }
    if let Some(items) = obj.get("items") {
        walk_schema(items, depth - 1, meta);
    }
    for combinator in ["anyOf", "allOf", "oneOf"] {
        if let Some(variants) = obj.get(combinator).and_then(Value::as_array) {
            for variant in variants {
                walk_schema(variant, depth - 1, meta);
            }
        }
    }
}

fn type_matches(value: &Value, declared: &str) -> bool {
    match declared {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn check_value(schema: &Value, value: &Value, path: &str, depth: usize, out: &mut Vec<String>) {
    if depth == 0 {
        return;
    }
    let obj = match schema.as_object() {
        Some(obj) => obj,
        None => return,
    };

    if let Some(declared) = obj.get("type").and_then(Value::as_str) {
        if !type_matches(value, declared) {
            out.push(format!("{path}: expected {declared}"));
            return;
        }
    }

    if let Some(required) = obj.get("required").and_then(Value::as_array) {
        if let Some(map) = value.as_object() {
            for key in required.iter().filter_map(Value::as_str) {
                if !map.contains_key(key) {
                    out.push(format!("{path}: missing required property \"{key}\""));
                }
            }
        }
    }

    if let (Some(props), Some(map)) = (
        obj.get("properties").and_then(Value::as_object),
        value.as_object(),
    ) {
        for (name, sub) in props {
            if let Some(child) = map.get(name) {
                check_value(sub, child, &format!("{path}.{name}"), depth - 1, out);
            }
        }
    }

    if let (Some(items), Some(elems)) = (obj.get("items"), value.as_array()) {
        for (i, elem) in elems.iter().enumerate() {
            check_value(items, elem, &format!("{path}[{i}]"), depth - 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name", "score"],
            "properties": {
                "name": {"type": "string"},
                "score": {"type": "number"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "detail": {
                    "type": "object",
                    "properties": {
                        "lineCount": {"type": "integer"},
                        "summary": {"type": "string"}
                    }
                }
            }
        })
    }

    #[test]
    fn metadata_collects_nested_names_and_types() {
        let meta = extract_metadata(&sample_schema(), MAX_SCHEMA_DEPTH);
        assert_eq!(
            meta.known_properties,
            vec!["name", "score", "tags", "detail", "lineCount", "summary"]
        );
        assert_eq!(meta.numeric_properties, vec!["score", "lineCount"]);
        assert_eq!(meta.array_properties, vec!["tags"]);
    }

    #[test]
    fn metadata_walks_union_variants() {
        let schema = json!({
            "anyOf": [
                {"type": "object", "properties": {"left": {"type": "string"}}},
                {"type": "object", "properties": {"right": {"type": "number"}}}
            ]
        });
        let meta = extract_metadata(&schema, MAX_SCHEMA_DEPTH);
        assert_eq!(meta.known_properties, vec!["left", "right"]);
        assert_eq!(meta.numeric_properties, vec!["right"]);
    }

    #[test]
    fn metadata_depth_is_bounded() {
        let mut schema = json!({"type": "string"});
        for i in 0..40 {
            let mut props = serde_json::Map::new();
            props.insert(format!("level{i}"), schema);
            schema = json!({"type": "object", "properties": Value::Object(props)});
        }
        let meta = extract_metadata(&schema, MAX_SCHEMA_DEPTH);
        assert!(meta.known_properties.len() <= MAX_SCHEMA_DEPTH);
    }

    #[test]
    fn validate_accepts_conformant_value() {
        let schema = TargetSchema::new(sample_schema());
        let value = json!({"name": "widget", "score": 3.5, "tags": ["a"]});
        assert!(schema.validate(&value).is_ok());
    }

    #[test]
    fn validate_reports_all_violations() {
        let schema = TargetSchema::new(sample_schema());
        let value = json!({"score": "high", "tags": [1]});
        let violations = schema.validate(&value).unwrap_err();
        assert!(violations.iter().any(|v| v.contains("missing required property \"name\"")));
        assert!(violations.iter().any(|v| v.contains("$.score: expected number")));
        assert!(violations.iter().any(|v| v.contains("$.tags[0]: expected string")));
    }
}
