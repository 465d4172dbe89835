// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Binding resolved documents into typed configuration instances.
//!
//! A typed instance type implements [`ConfigInstance`] and exposes an
//! [`InstanceBuilder`] that receives leaf literals and hands out child
//! builders by field name. [`bind`] walks the schema, feeds every value the
//! document carries, and falls back to the declared default literal for
//! leaves the document omits. Leaf setters for one type are usually kept in
//! a [`SetterTable`] built once.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value};
use stratum_schema::{parse_double, ConfigDefinition, ConfigDefinitionKey, FieldCategory, FieldDef};
use thiserror::Error;
use tracing::warn;

use crate::document::leaf_text;
use crate::Document;

/// Failure to bind a document into a typed instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The instance builder has no slot for this field.
    #[error("no setter for field '{0}'")]
    UnknownField(String),
    /// A setter rejected the literal it was given.
    #[error("invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        /// Field being set.
        field: String,
        /// Rejected literal.
        value: String,
        /// Parser detail.
        message: String,
    },
    /// The document shape disagrees with the schema.
    #[error("field '{field}' is not a {expected} in the document")]
    Shape {
        /// Offending field.
        field: String,
        /// Category the schema declares.
        expected: FieldCategory,
    },
    /// A field without value or default was required by the instance type.
    #[error("required field '{0}' has no value")]
    MissingField(String),
}

/// Receiver of leaf literals and child builders for one struct level.
///
/// Every method defaults to [`BindError::UnknownField`], so an implementation
/// only overrides the shapes its type actually has.
pub trait InstanceBuilder {
    /// Set a scalar leaf.
    fn set_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError>;

    /// Append one element to a leaf array.
    fn push_leaf(&mut self, name: &str, _value: &str) -> Result<(), BindError> {
        Err(BindError::UnknownField(name.to_owned()))
    }

    /// Insert one entry into a leaf map.
    fn put_leaf(&mut self, name: &str, _key: &str, _value: &str) -> Result<(), BindError> {
        Err(BindError::UnknownField(name.to_owned()))
    }

    /// Builder of the nested struct `name`.
    fn child(&mut self, name: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        Err(BindError::UnknownField(name.to_owned()))
    }

    /// Builder of a new element appended to the inner array `name`.
    fn push_child(&mut self, name: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        Err(BindError::UnknownField(name.to_owned()))
    }

    /// Builder of the struct-map entry `key` in `name`.
    fn put_child(&mut self, name: &str, _key: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        Err(BindError::UnknownField(name.to_owned()))
    }
}

/// A typed configuration produced from a resolved document.
pub trait ConfigInstance: Sized {
    /// Builder fed by [`bind`].
    type Builder: InstanceBuilder + Default;

    /// Definition name this type was generated from.
    const NAME: &'static str;
    /// Definition namespace this type was generated from.
    const NAMESPACE: &'static str;

    /// Finish a populated builder.
    fn build(builder: Self::Builder) -> Result<Self, BindError>;

    /// `(name, namespace)` of the definition this type binds.
    fn definition_key() -> ConfigDefinitionKey {
        ConfigDefinitionKey::new(Self::NAME, Self::NAMESPACE)
    }
}

/// Setter for one leaf of builder type `B`.
pub type LeafSetter<B> = fn(&mut B, &str) -> Result<(), BindError>;

/// Name-to-setter lookup for the leaves of one builder type.
pub struct SetterTable<B> {
    setters: BTreeMap<&'static str, LeafSetter<B>>,
}

impl<B> SetterTable<B> {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            setters: BTreeMap::new(),
        }
    }

    /// Register `setter` for `name`.
    #[must_use]
    pub fn with(mut self, name: &'static str, setter: LeafSetter<B>) -> Self {
        self.setters.insert(name, setter);
        self
    }

    /// Dispatch `value` to the setter registered for `name`.
    pub fn set(&self, target: &mut B, name: &str, value: &str) -> Result<(), BindError> {
        let setter = self
            .setters
            .get(name)
            .ok_or_else(|| BindError::UnknownField(name.to_owned()))?;
        setter(target, value)
    }

    /// Registered field names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.setters.keys().copied()
    }
}

impl<B> Default for SetterTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> std::fmt::Debug for SetterTable<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.setters.keys()).finish()
    }
}

/// Parse a leaf literal with [`FromStr`], mapping failure to
/// [`BindError::InvalidValue`].
pub fn parse_leaf<T>(field: &str, value: &str) -> Result<T, BindError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| BindError::InvalidValue {
        field: field.to_owned(),
        value: value.to_owned(),
        message: e.to_string(),
    })
}

/// Parse a bool leaf literal (`true`/`false`, any case).
pub fn parse_bool(field: &str, value: &str) -> Result<bool, BindError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(BindError::InvalidValue {
            field: field.to_owned(),
            value: value.to_owned(),
            message: "not a boolean literal".into(),
        })
    }
}

/// Parse a double leaf literal, accepting `Infinity` and `-Infinity`.
pub fn parse_f64(field: &str, value: &str) -> Result<f64, BindError> {
    parse_double(value).map_err(|e| BindError::InvalidValue {
        field: field.to_owned(),
        value: value.to_owned(),
        message: e.to_string(),
    })
}

/// Bind `doc` into a `T` using `schema` to drive the walk.
pub fn bind<T: ConfigInstance>(doc: &Document, schema: &ConfigDefinition) -> Result<T, BindError> {
    let empty = Map::new();
    let map = match doc {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            return Err(BindError::Shape {
                field: schema.name().to_owned(),
                expected: FieldCategory::Struct,
            })
        }
    };
    let mut builder = T::Builder::default();
    populate(&mut builder, map, schema)?;
    T::build(builder)
}

/// Bind `doc`, and on failure log a warning and bind the schema defaults
/// alone; if that fails too, return `T::default()`.
pub fn bind_or_default<T>(doc: &Document, schema: &ConfigDefinition) -> T
where
    T: ConfigInstance + Default,
{
    match bind(doc, schema) {
        Ok(instance) => instance,
        Err(err) => {
            warn!(?err, definition = %schema.key(), "binding failed; serving defaults");
            bind(&Value::Null, schema).unwrap_or_default()
        }
    }
}

/// Feed one struct level of a document into `target`.
pub fn populate(
    target: &mut dyn InstanceBuilder,
    map: &Map<String, Value>,
    schema: &ConfigDefinition,
) -> Result<(), BindError> {
    let empty = Map::new();
    for (name, field) in schema.fields() {
        let value = map.get(name).filter(|v| !v.is_null());
        match field {
            FieldDef::Leaf(spec) => {
                let literal = match value {
                    Some(v) => Some(leaf_literal(name, v)?),
                    None => spec.default_value().map(str::to_owned),
                };
                if let Some(literal) = literal {
                    target.set_leaf(name, &literal)?;
                }
            }
            FieldDef::Struct(child) => {
                let inner = match value {
                    Some(v) => as_object(name, v, FieldCategory::Struct)?,
                    None => &empty,
                };
                populate(target.child(name)?, inner, child)?;
            }
            FieldDef::Array(_) => {
                if let Some(v) = value {
                    for item in as_array(name, v)? {
                        target.push_leaf(name, &leaf_literal(name, item)?)?;
                    }
                }
            }
            FieldDef::InnerArray(child) => {
                if let Some(v) = value {
                    for item in as_array(name, v)? {
                        let inner = as_object(name, item, FieldCategory::InnerArray)?;
                        populate(target.push_child(name)?, inner, child)?;
                    }
                }
            }
            FieldDef::LeafMap(_) => {
                if let Some(v) = value {
                    for (key, item) in as_object(name, v, FieldCategory::LeafMap)? {
                        target.put_leaf(name, key, &leaf_literal(name, item)?)?;
                    }
                }
            }
            FieldDef::StructMap(child) => {
                if let Some(v) = value {
                    for (key, item) in as_object(name, v, FieldCategory::StructMap)? {
                        let inner = as_object(name, item, FieldCategory::StructMap)?;
                        populate(target.put_child(name, key)?, inner, child)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn leaf_literal(field: &str, value: &Value) -> Result<String, BindError> {
    leaf_text(value).ok_or_else(|| BindError::Shape {
        field: field.to_owned(),
        expected: FieldCategory::Leaf,
    })
}

fn as_object<'v>(
    field: &str,
    value: &'v Value,
    expected: FieldCategory,
) -> Result<&'v Map<String, Value>, BindError> {
    value.as_object().ok_or_else(|| BindError::Shape {
        field: field.to_owned(),
        expected,
    })
}

fn as_array<'v>(field: &str, value: &'v Value) -> Result<&'v [Value], BindError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| BindError::Shape {
            field: field.to_owned(),
            expected: FieldCategory::Array,
        })
}
