use jsonmend::sanitize::STRATEGIES;
use jsonmend::{sanitize, SanitizerConfig};

#[test]
fn pipeline_order_is_pinned() {
    // The table order is the only sequencing contract between strategies;
    // any reordering must be deliberate enough to update this list.
    let names: Vec<&str> = STRATEGIES.iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            "normalize_smart_quotes",
            "strip_control_outside_strings",
            "strip_comments",
            "normalize_literal_tokens",
            "normalize_key_separators",
            "convert_single_quoted_strings",
            "escape_string_controls",
            "reduce_over_escaping",
            "quote_unquoted_values",
            "merge_concatenated_key_fragments",
            "add_missing_key_quotes",
            "strip_key_underscores",
            "repair_corrupted_property_names",
            "split_embedded_value_keys",
            "apply_extra_rules",
            "replace_corrupted_array_tokens",
            "strip_array_leadin_words",
            "quote_bare_array_elements",
            "remove_duplicate_array_entries",
            "insert_missing_array_commas",
            "remove_stray_commentary",
            "remove_artifact_properties",
            "insert_null_for_dangling_keys",
            "split_truncated_array_objects",
            "remove_glued_delimiter_tokens",
            "remove_trailing_commas",
            "close_unterminated_structures",
        ]
    );
}

#[test]
fn messy_response_converges_and_parses() {
    let config = SanitizerConfig::default();
    let messy = "{\u{201C}name\u{201D}: \u{2018}Widget\u{2019},\n// model note\ntags: [alpha, \"beta\" \"gamma\"],\n\"count\": 3 items,\n\"note\": }";
    let (repaired, steps) = sanitize(messy, &config);
    assert!(!steps.is_empty());
    let value: serde_json::Value = serde_json::from_str(&repaired).expect("repaired text parses");
    assert_eq!(value["name"], serde_json::json!("Widget"));
    assert_eq!(value["tags"], serde_json::json!(["alpha", "beta", "gamma"]));
    assert_eq!(value["note"], serde_json::Value::Null);
}

// Running the full pipeline twice must be a fixed point: the second pass
// changes nothing and reports nothing.
#[test]
fn sanitize_twice_is_identical() {
    let config = SanitizerConfig::default();
    let messy = "{\u{201C}name\u{201D}: \u{2018}Widget\u{2019},\n// model note\ntags: [alpha, \"beta\" \"gamma\"],\n\"count\": 3 items,\n\"llm_confidence\": 0.9,\n\"note\": }";
    let (first, _) = sanitize(messy, &config);
    let (second, steps) = sanitize(&first, &config);
    assert_eq!(first, second);
    assert!(steps.is_empty(), "second pass reported: {steps:?}");
}

#[test]
fn valid_json_passes_byte_identical() {
    let config = SanitizerConfig::default();
    let clean = "{\n  \"name\": \"Widget's \\\"best\\\"\",\n  \"path\": \"C:\\\\dir\\\\file\",\n  \"items\": [{\"id\": 1, \"tags\": [\"a\", \"b\"]}, {\"id\": 2, \"tags\": []}],\n  \"ok\": true,\n  \"ratio\": 1.5e-3,\n  \"note\": null\n}";
    let (out, steps) = sanitize(clean, &config);
    assert_eq!(out, clean);
    assert!(steps.is_empty(), "no-op input reported: {steps:?}");
}

// Regression for the one pinned cross-strategy dependency: the partial
// re-attempt must be removed before comma insertion could stitch it in as a
// legitimate element.
#[test]
fn duplicate_removal_runs_before_comma_insertion() {
    let config = SanitizerConfig::default();
    let (out, _) = sanitize("[\"alpha\" \"alp", &config);
    assert_eq!(out, "[\"alpha\"]");
}

// The bounded lookback window is a tunable trade-off: too small a window
// misclassifies context after a long string and the repair conservatively
// does not fire. This pins the boundary instead of silently widening it.
#[test]
fn tiny_lookback_window_disables_distant_array_repair() {
    let text = "[\"aaaaaaaaaaaaaaaa\", beta]";

    let config = SanitizerConfig::default();
    let (out, _) = sanitize(text, &config);
    assert_eq!(out, "[\"aaaaaaaaaaaaaaaa\", \"beta\"]");

    let small = SanitizerConfig {
        lookback_window: 8,
        ..SanitizerConfig::default()
    };
    let (out, _) = sanitize(text, &small);
    assert_eq!(out, text, "window too small to prove array context");
}

#[test]
fn every_strategy_returns_unchanged_on_empty_input() {
    let config = SanitizerConfig::default();
    for strategy in STRATEGIES {
        let result = (strategy.run)("", &config);
        assert!(!result.changed, "{} changed empty input", strategy.name);
        assert!(result.diagnostics.is_empty());
    }
}

#[test]
fn strategies_never_panic_on_hostile_fragments() {
    let config = SanitizerConfig::default();
    let hostile = [
        "\"",
        "\\",
        "{\"a\\",
        "::::",
        ",,,,",
        "[[[[",
        "}}}}",
        "{\"a\": \"\\u12",
        "\u{FEFF}\u{201C}\u{2019}",
        "+ \"x\" +",
        "a\u{0}b",
    ];
    for text in hostile {
        for strategy in STRATEGIES {
            let _ = (strategy.run)(text, &config);
        }
        let (_, _) = sanitize(text, &config);
    }
}
