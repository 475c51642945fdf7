//! Tests for the JSON output formats.
//!
//! These tests pin the field names and value encodings that consumers of
//! `--format json` rely on.

use std::path::PathBuf;

use serde_json::Value;

use stacklens::cli::load_documents;
use stacklens::report;
use stacklens::{analyze, detect_stack, CodebaseAnalysis, FeatureKind, GapReport};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analysis_json(name: &str) -> Value {
    let path = testdata_path().join(name);
    let analysis = analyze(path.to_str().unwrap()).expect("analysis should succeed");
    let json = report::to_json(&analysis).expect("analysis should serialize");
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_analysis_json_top_level_keys() {
    let value = analysis_json("phoenix_app");
    let object = value.as_object().expect("analysis should be an object");
    for key in [
        "path",
        "language",
        "framework",
        "routes",
        "models",
        "controllers",
        "components",
        "services",
        "config",
        "readme",
    ] {
        assert!(object.contains_key(key), "missing key {}", key);
    }
    assert_eq!(value["language"], "elixir");
    assert_eq!(value["framework"], "phoenix");
}

#[test]
fn test_record_json_shapes() {
    let value = analysis_json("phoenix_app");

    let route = &value["routes"][0];
    for key in ["method", "path", "handler", "file"] {
        assert!(route.get(key).is_some(), "route missing {}", key);
    }

    let field = &value["models"][0]["fields"][0];
    assert_eq!(field["name"], "email");
    assert_eq!(field["type"], "string");

    assert!(value["controllers"][0]["actions"].is_array());
    assert!(value["services"][0]["functions"].is_array());
}

#[test]
fn test_unknown_stack_json() {
    let value = analysis_json("unknown_stack");
    assert_eq!(value["language"], "unknown");
    assert!(value["framework"].is_null());
    assert!(value["readme"].is_null());
    assert_eq!(value["config"], serde_json::json!({}));
    assert_eq!(value["routes"][0]["handler"], Value::Null);
}

#[test]
fn test_analysis_json_round_trips() {
    let path = testdata_path().join("next_app");
    let analysis = analyze(path.to_str().unwrap()).unwrap();
    let json = report::to_json(&analysis).unwrap();
    let back: CodebaseAnalysis = serde_json::from_str(&json).unwrap();
    assert_eq!(back, analysis);
}

#[test]
fn test_stack_json() {
    let path = testdata_path().join("flask_app");
    let stack = detect_stack(path.to_str().unwrap()).unwrap();
    let value: Value = serde_json::from_str(&report::to_json(&stack).unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({"language": "python", "framework": "flask"}));
}

#[test]
fn test_gap_report_json() {
    let testdata = testdata_path();
    let documents = load_documents(&testdata.join("docs.json")).expect("docs should parse");
    assert_eq!(documents.len(), 2);

    let analysis = analyze(testdata.join("phoenix_app").to_str().unwrap()).unwrap();
    let report = GapReport::new(&analysis, &documents);
    assert_eq!(report.documents, 2);

    let gaps: Vec<(&str, FeatureKind)> = report.gaps.iter().map(|f| (f.name.as_str(), f.kind)).collect();
    assert_eq!(gaps, vec![("user", FeatureKind::Entity)]);

    let value: Value = serde_json::from_str(&report::to_json(&report).unwrap()).unwrap();
    assert_eq!(value["documents"], 2);
    assert_eq!(value["gaps"][0]["kind"], "entity");
    assert_eq!(value["gaps"][0]["origin"], "lib/shop/accounts/user.ex");
    assert!(value["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f["name"] == "users" && f["kind"] == "route"));
}
