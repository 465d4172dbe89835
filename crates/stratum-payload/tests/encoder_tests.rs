// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use serde_json::json;
use stratum_dry_tests::{nested_document, nested_schema};
use stratum_payload::{apply_defaults, TextEncoder};

#[test]
fn struct_leaf_encodes_as_dotted_path() {
    let schema = nested_schema();
    let text = TextEncoder::new(&schema)
        .encode_to_string(&json!({"simple": {"name": "myname"}}))
        .unwrap();
    assert_eq!(text, "simple.name \"myname\"\n");
}

#[test]
fn undeclared_fields_produce_no_lines() {
    let schema = nested_schema();
    let lines = TextEncoder::new(&schema)
        .lines(&json!({"undeclared": "x", "other": {"a": 1}}))
        .unwrap();
    assert!(lines.is_empty());
}

#[test]
fn embedded_quotes_and_backslashes_are_escaped() {
    let schema = nested_schema();
    let lines = TextEncoder::new(&schema)
        .lines(&json!({"stringval": "some\"quotes\\\"instring"}))
        .unwrap();
    assert_eq!(lines, vec![r#"stringval "some\"quotes\\\"instring""#]);
}

#[test]
fn full_document_after_defaults() {
    let schema = nested_schema();
    let mut doc = nested_document();
    apply_defaults(&mut doc, &schema);
    let encoder = TextEncoder::new(&schema);
    let text = encoder.encode_to_string(&doc).unwrap();
    let expected = r#"stringval "some\"quotes\\\"instring"
intval 42
boolval false
doubleval 1.5
enumval FOO
simple.name "myname"
simple.gender MALE
stringarr[0] "a"
stringarr[1] "b"
nestedarr[0].foo "x"
nestedarr[0].bar 3
nestedarr[1].foo "y"
nestedarr[1].bar 7
leafmap{"k1"} 1
leafmap{"k2"} 2
innermap{"bar"}.foo 5
innermap{"baz"}.foo 1
"#;
    assert_eq!(text, expected);
    assert_eq!(encoder.encode_to_string(&doc).unwrap(), text);
}
