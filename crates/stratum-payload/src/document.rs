// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Building payload trees from existing documents.

use serde_json::{Map, Value};
use stratum_schema::{ConfigDefinition, FieldDef};
use tracing::trace;

use crate::builder::{ArrayBuilder, ArrayMode, Element, PayloadBuilder, PayloadNode};
use crate::error::{NodeKind, PayloadError};
use crate::Document;

/// Text form of a scalar document value; `None` for null, objects and arrays.
pub fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
    }
}

pub(crate) const fn value_kind(value: &Value) -> NodeKind {
    match value {
        Value::Object(_) => NodeKind::Struct,
        Value::Array(_) => NodeKind::Array,
        _ => NodeKind::Leaf,
    }
}

fn mirror<'s>(name: &str, value: &Value) -> Option<PayloadNode<'s>> {
    match value {
        Value::Null => None,
        Value::Object(_) => Some(PayloadNode::Struct(PayloadBuilder::from_document(value))),
        Value::Array(items) => {
            let mut array = ArrayBuilder::new(name, Element::Unbound);
            array.elements = items.iter().map(|item| mirror(name, item)).collect();
            array.mode = if array.elements.is_empty() {
                ArrayMode::Unset
            } else if array.elements.iter().any(Option::is_none) {
                ArrayMode::Indexed
            } else {
                ArrayMode::Append
            };
            Some(PayloadNode::Array(array))
        }
        leaf => leaf_text(leaf).map(PayloadNode::Leaf),
    }
}

fn expect_leaf(field: &str, value: &Value) -> Result<String, PayloadError> {
    leaf_text(value).ok_or_else(|| PayloadError::ShapeConflict {
        field: field.to_owned(),
        expected: NodeKind::Leaf,
        found: value_kind(value),
    })
}

fn expect_object<'v>(field: &str, value: &'v Value) -> Result<&'v Map<String, Value>, PayloadError> {
    value.as_object().ok_or_else(|| PayloadError::ShapeConflict {
        field: field.to_owned(),
        expected: NodeKind::Struct,
        found: value_kind(value),
    })
}

fn expect_array<'v>(field: &str, value: &'v Value) -> Result<&'v [Value], PayloadError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| PayloadError::ShapeConflict {
            field: field.to_owned(),
            expected: NodeKind::Array,
            found: value_kind(value),
        })
}

impl<'s> PayloadBuilder<'s> {
    /// Unbound builder mirroring `doc`. Objects become structs, arrays keep
    /// their positions (nulls become gaps), scalars become leaf text and
    /// top-level nulls are dropped. A non-object `doc` yields an empty builder.
    pub fn from_document(doc: &Document) -> Self {
        let mut builder = Self::new();
        if let Value::Object(map) = doc {
            for (name, value) in map {
                if let Some(node) = mirror(name, value) {
                    builder.fields.insert(name.as_str(), node);
                }
            }
        }
        builder
    }

    /// Builder bound to `schema`, populated from `doc` through the regular
    /// builder operations so every leaf is validated. Objects are classified
    /// as structs or maps by the schema; fields the schema does not declare
    /// are ignored, and null values (including null array elements) are
    /// skipped.
    pub fn from_document_with_schema(
        doc: &Document,
        schema: &'s ConfigDefinition,
    ) -> Result<Self, PayloadError> {
        let mut builder = Self::bound(schema);
        match doc {
            Value::Null => {}
            Value::Object(map) => builder.load(schema, map)?,
            other => {
                return Err(PayloadError::ShapeConflict {
                    field: schema.name().to_owned(),
                    expected: NodeKind::Struct,
                    found: value_kind(other),
                })
            }
        }
        Ok(builder)
    }

    fn load(
        &mut self,
        schema: &'s ConfigDefinition,
        map: &Map<String, Value>,
    ) -> Result<(), PayloadError> {
        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            let Some(field) = schema.field(name) else {
                trace!(field = %name, definition = %schema.name(), "skipping undeclared field");
                continue;
            };
            match field {
                FieldDef::Leaf(_) => {
                    self.set_field(name, expect_leaf(name, value)?)?;
                }
                FieldDef::Struct(child) => {
                    let object = expect_object(name, value)?;
                    self.get_object(name)?.load(child, object)?;
                }
                FieldDef::Array(_) => {
                    let items = expect_array(name, value)?;
                    let array = self.get_array(name)?;
                    for item in items.iter().filter(|v| !v.is_null()) {
                        array.append(expect_leaf(name, item)?)?;
                    }
                }
                FieldDef::InnerArray(child) => {
                    let items = expect_array(name, value)?;
                    let array = self.get_array(name)?;
                    for item in items.iter().filter(|v| !v.is_null()) {
                        let object = expect_object(name, item)?;
                        array.append_struct()?.load(child, object)?;
                    }
                }
                FieldDef::LeafMap(_) => {
                    let entries = expect_object(name, value)?;
                    let target = self.get_map(name)?;
                    for (key, item) in entries.iter().filter(|(_, v)| !v.is_null()) {
                        target.put(key.as_str(), expect_leaf(name, item)?)?;
                    }
                }
                FieldDef::StructMap(child) => {
                    let entries = expect_object(name, value)?;
                    let target = self.get_map(name)?;
                    for (key, item) in entries.iter().filter(|(_, v)| !v.is_null()) {
                        let object = expect_object(name, item)?;
                        target.put_struct(key)?.load(child, object)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratum_schema::{parse_definition, SchemaViolation};

    #[test]
    fn mirrors_document_shape() {
        let doc = json!({
            "s": "x",
            "n": 3,
            "f": 1.5,
            "b": true,
            "skip": null,
            "obj": {"inner": "y"},
            "arr": ["a", null, {"k": "v"}],
        });
        let b = PayloadBuilder::from_document(&doc);
        assert_eq!(b.leaf("n"), Some("3"));
        assert_eq!(b.leaf("b"), Some("true"));
        assert!(b.field("skip").is_none());
        let Some(PayloadNode::Array(arr)) = b.field("arr") else {
            panic!("arr must mirror as an array");
        };
        assert_eq!(arr.mode(), ArrayMode::Indexed);
        assert_eq!(
            b.resolve(),
            json!({
                "s": "x",
                "n": "3",
                "f": "1.5",
                "b": "true",
                "obj": {"inner": "y"},
                "arr": ["a", null, {"k": "v"}],
            })
        );
    }

    #[test]
    fn schema_load_classifies_and_validates() {
        let def = parse_definition(
            "load",
            "\
count int
simple.name string
tags[] string
nested[].value int
labels{} long
inner{}.flag bool
",
        )
        .unwrap();
        let doc = json!({
            "count": 4,
            "simple": {"name": "n"},
            "tags": ["a", "b"],
            "nested": [{"value": 1}, {"value": 2}],
            "labels": {"x": 10},
            "inner": {"k": {"flag": true}},
            "undeclared": "ignored",
        });
        let b = PayloadBuilder::from_document_with_schema(&doc, &def).unwrap();
        assert!(b.field("undeclared").is_none());
        assert!(matches!(b.field("labels"), Some(PayloadNode::Map(_))));
        assert_eq!(
            b.resolve(),
            json!({
                "count": "4",
                "simple": {"name": "n"},
                "tags": ["a", "b"],
                "nested": [{"value": "1"}, {"value": "2"}],
                "labels": {"x": "10"},
                "inner": {"k": {"flag": "true"}},
            })
        );

        let bad = json!({"count": "many"});
        assert!(matches!(
            PayloadBuilder::from_document_with_schema(&bad, &def),
            Err(PayloadError::Schema(SchemaViolation::InvalidValue { .. }))
        ));
        let wrong_shape = json!({"simple": "flat"});
        assert!(matches!(
            PayloadBuilder::from_document_with_schema(&wrong_shape, &def),
            Err(PayloadError::ShapeConflict { .. })
        ));
    }
}
