// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema-driven backfill of absent leaf values.

use serde_json::{Map, Number, Value};
use stratum_schema::{format_double, parse_double, ConfigDefinition, FieldDef, LeafKind, LeafSpec};
use tracing::{trace, warn};

use crate::Document;

/// Inject declared defaults into `doc` in place and return how many leaves
/// were written.
///
/// Only absent (or `null`) leaves are written, so applying twice is a no-op
/// the second time. Absent structs are created only when something inside
/// them receives a default; absent inner arrays become empty arrays. A `null`
/// document is treated as an empty object; any other non-object document is
/// left untouched.
pub fn apply_defaults(doc: &mut Document, schema: &ConfigDefinition) -> usize {
    if doc.is_null() {
        *doc = Value::Object(Map::new());
    }
    match doc {
        Value::Object(map) => apply_to_object(map, schema),
        _ => {
            warn!(definition = %schema.key(), "document root is not an object; defaults not applied");
            0
        }
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

fn apply_to_object(map: &mut Map<String, Value>, schema: &ConfigDefinition) -> usize {
    let mut written = 0;
    for (name, field) in schema.fields() {
        match field {
            FieldDef::Leaf(spec) => {
                if !is_absent(map.get(name)) {
                    continue;
                }
                if let Some(literal) = spec.default_value() {
                    trace!(field = name, default = literal, "injecting default");
                    map.insert(name.to_owned(), typed_default(spec, literal));
                    written += 1;
                }
            }
            FieldDef::Struct(child) => match map.get_mut(name) {
                Some(Value::Object(inner)) => written += apply_to_object(inner, child),
                Some(value) if !value.is_null() => {}
                _ => {
                    let mut inner = Map::new();
                    let injected = apply_to_object(&mut inner, child);
                    if !inner.is_empty() {
                        map.insert(name.to_owned(), Value::Object(inner));
                    }
                    written += injected;
                }
            },
            FieldDef::InnerArray(child) => match map.get_mut(name) {
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Value::Object(element) = item {
                            written += apply_to_object(element, child);
                        }
                    }
                }
                Some(value) if !value.is_null() => {}
                _ => {
                    map.insert(name.to_owned(), Value::Array(Vec::new()));
                }
            },
            FieldDef::StructMap(child) => {
                if let Some(Value::Object(entries)) = map.get_mut(name) {
                    for entry in entries.values_mut() {
                        if let Value::Object(element) = entry {
                            written += apply_to_object(element, child);
                        }
                    }
                }
            }
            FieldDef::Array(_) | FieldDef::LeafMap(_) => {}
        }
    }
    written
}

/// Typed document value for a default literal: bools and integers as JSON
/// scalars, finite doubles as numbers, infinities and everything else as
/// strings.
pub fn typed_default(spec: &LeafSpec, literal: &str) -> Value {
    match spec.kind() {
        LeafKind::Bool => Value::Bool(literal == "true"),
        LeafKind::Int | LeafKind::Long => literal
            .parse::<i64>()
            .map_or_else(|_| Value::String(literal.to_owned()), Value::from),
        LeafKind::Double => match parse_double(literal) {
            Ok(value) => Number::from_f64(value)
                .map_or_else(|| Value::String(format_double(value)), Value::Number),
            Err(_) => Value::String(literal.to_owned()),
        },
        LeafKind::String | LeafKind::Enum | LeafKind::Reference | LeafKind::File => {
            Value::String(literal.to_owned())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratum_schema::parse_definition;

    fn schema() -> ConfigDefinition {
        parse_definition(
            "defaults",
            r#"
flag bool default=true
count int default=3
big long default=-9
ratio double default=1.5
huge double default=Infinity
name string default="n"
mode enum { A, B } default=B
nodefault string
simple.inner int default=7
empty.nothing string
nestedarr[].v int default=1
tags[] string
structmap{}.w bool default=false
"#,
        )
        .unwrap()
    }

    #[test]
    fn injects_typed_defaults() {
        let mut doc = json!({});
        let written = apply_defaults(&mut doc, &schema());
        assert_eq!(
            doc,
            json!({
                "flag": true,
                "count": 3,
                "big": -9,
                "ratio": 1.5,
                "huge": "Infinity",
                "name": "n",
                "mode": "B",
                "simple": {"inner": 7},
                "nestedarr": [],
            })
        );
        assert_eq!(written, 8);
    }

    #[test]
    fn present_values_are_kept() {
        let mut doc = json!({"count": "9", "simple": {"inner": 1}, "unknown": 5});
        apply_defaults(&mut doc, &schema());
        assert_eq!(doc["count"], json!("9"));
        assert_eq!(doc["simple"], json!({"inner": 1}));
        assert_eq!(doc["unknown"], json!(5));
    }

    #[test]
    fn null_leaves_count_as_absent() {
        let mut doc = json!({"count": null});
        apply_defaults(&mut doc, &schema());
        assert_eq!(doc["count"], json!(3));
    }

    #[test]
    fn existing_elements_and_entries_get_struct_defaults() {
        let mut doc = json!({
            "nestedarr": [{}, {"v": 5}],
            "structmap": {"a": {}, "b": {"w": true}},
        });
        apply_defaults(&mut doc, &schema());
        assert_eq!(doc["nestedarr"], json!([{"v": 1}, {"v": 5}]));
        assert_eq!(doc["structmap"], json!({"a": {"w": false}, "b": {"w": true}}));
    }

    #[test]
    fn second_application_writes_nothing() {
        let mut doc = json!({"nestedarr": [{}]});
        let def = schema();
        assert!(apply_defaults(&mut doc, &def) > 0);
        let once = doc.clone();
        assert_eq!(apply_defaults(&mut doc, &def), 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn null_root_becomes_object_and_scalars_are_left_alone() {
        let mut doc = Value::Null;
        apply_defaults(&mut doc, &schema());
        assert!(doc.is_object());
        let mut scalar = json!(5);
        assert_eq!(apply_defaults(&mut scalar, &schema()), 0);
        assert_eq!(scalar, json!(5));
    }
}
