//! Verify response shaping against JSON test vectors in `test-vectors/`.
//!
//! Each case names a format, optional key filters and spacer, a raw payload
//! and the expected shaped result or error variant. Structured results are
//! compared as parsed JSON; formatted text is compared byte for byte since
//! indentation is what is under test.

use std::collections::HashSet;

use dualfetch_core::{shape, FormatError, Payload, ResponseData, ShapeOptions, Spacer};
use serde_json::Value;

fn key_set(case: &Value, field: &str) -> Option<HashSet<String>> {
    case.get(field).map(|keys| {
        keys.as_array()
            .unwrap()
            .iter()
            .map(|k| k.as_str().unwrap().to_string())
            .collect()
    })
}

fn options(case: &Value) -> ShapeOptions {
    let spacer = match case.get("spacer") {
        Some(Value::String(s)) => Spacer::Text(s.clone()),
        Some(Value::Number(n)) => Spacer::Width(n.as_u64().unwrap() as usize),
        Some(other) => panic!("unsupported spacer: {other}"),
        None => Spacer::default(),
    };
    ShapeOptions {
        format: case["format"].as_str().unwrap().to_string(),
        whitelist: key_set(case, "whitelist"),
        blacklist: key_set(case, "blacklist"),
        replacer: None,
        spacer,
    }
}

fn payload(case: &Value) -> Payload {
    if let Some(text) = case.get("payload_text") {
        Payload::Text(text.as_str().unwrap().to_string())
    } else {
        Payload::Json(case["payload_json"].clone())
    }
}

#[test]
fn shaping_test_vectors() {
    let raw = include_str!("../../test-vectors/shaping.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = shape(&options(case), payload(case));

        if let Some(expected) = case.get("expected_text") {
            let data = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(
                data,
                ResponseData::Text(expected.as_str().unwrap().to_string()),
                "{name}: text"
            );
        } else if let Some(expected) = case.get("expected_json") {
            let data = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(data, ResponseData::Json(expected.clone()), "{name}: json");
        } else {
            let err = result.unwrap_err();
            match case["expected_error"].as_str().unwrap() {
                "Parse" => assert!(matches!(err, FormatError::Parse(_)), "{name}: expected Parse"),
                "UnknownFormat" => {
                    assert!(matches!(err, FormatError::UnknownFormat(_)), "{name}: expected UnknownFormat")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        }
    }
}
