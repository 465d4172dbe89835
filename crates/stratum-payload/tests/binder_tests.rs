// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use serde_json::json;
use stratum_dry_tests::{nested_document, nested_schema, Enumval, Gender, Inner, Nested, NestedConfig};
use stratum_payload::{bind, bind_or_default, BindError, ConfigInstance};

#[test]
fn binds_every_category() {
    let schema = nested_schema();
    let config: NestedConfig = bind(&nested_document(), &schema).unwrap();
    assert_eq!(config.stringval, "some\"quotes\\\"instring");
    assert_eq!(config.intval, 42);
    assert!(!config.boolval);
    assert!((config.doubleval - 1.5).abs() < f64::EPSILON);
    assert_eq!(config.enumval, Enumval::Foo);
    assert_eq!(config.simple.name, "myname");
    assert_eq!(config.simple.gender, Gender::Male);
    assert_eq!(config.stringarr, vec!["a", "b"]);
    assert_eq!(
        config.nestedarr,
        vec![
            Nested { foo: "x".into(), bar: 3 },
            Nested { foo: "y".into(), bar: 7 },
        ]
    );
    assert_eq!(config.leafmap.get("k2"), Some(&2));
    assert_eq!(config.innermap.get("baz"), Some(&Inner { foo: 1 }));
    assert_eq!(NestedConfig::definition_key(), schema.key());
}

#[test]
fn empty_document_binds_to_defaults() {
    let config: NestedConfig = bind(&json!({}), &nested_schema()).unwrap();
    assert_eq!(config.stringval, "foo");
    assert_eq!(config.simple.name, "simplename");
    assert!(config.nestedarr.is_empty());
}

#[test]
fn element_without_required_leaf_fails() {
    let doc = json!({"nestedarr": [{"bar": 1}]});
    let err = bind::<NestedConfig>(&doc, &nested_schema()).unwrap_err();
    assert_eq!(err, BindError::MissingField("nestedarr[].foo".into()));
}

#[test]
fn fallback_replaces_broken_documents_with_defaults() {
    let doc = json!({"enumval": "NOPE", "intval": 5});
    let config: NestedConfig = bind_or_default(&doc, &nested_schema());
    assert_eq!(config.enumval, Enumval::Foo);
    assert_eq!(config.intval, 0);
}
