// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutable staging tree for configuration values.
//!
//! A [`PayloadBuilder`] is a struct-like node holding named children. It may
//! be bound to a [`ConfigDefinition`], in which case every operation is
//! checked against the schema and child nodes inherit the matching child
//! schema. Unbound builders accept any field.
//!
//! Builders are single-owner: all mutation goes through `&mut`, and a failed
//! operation leaves the tree exactly as it was.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use stratum_schema::{ConfigDefinition, FieldCategory, FieldDef, FieldTable, LeafSpec, SchemaViolation};

use crate::error::{NodeKind, PayloadError};
use crate::Document;

/// Upper bound on the number of slots one array may hold. Indices at or
/// beyond it fail with [`PayloadError::IndexOutOfRange`].
pub const MAX_ARRAY_LEN: usize = 1 << 20;

/// Access mode of an array, fixed by its first mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArrayMode {
    /// No element written yet.
    #[default]
    Unset,
    /// Grown with `append`/`append_struct`.
    Append,
    /// Written with `set`/`set_struct`; gaps allowed.
    Indexed,
}

impl std::fmt::Display for ArrayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unset => "unset",
            Self::Append => "append",
            Self::Indexed => "indexed",
        })
    }
}

/// Schema of the elements held by an array or map node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Element<'s> {
    Unbound,
    Leaf(&'s LeafSpec),
    Struct(&'s ConfigDefinition),
}

impl<'s> Element<'s> {
    fn leaf_value(self, field: &str, value: String) -> Result<String, PayloadError> {
        match self {
            Self::Unbound => Ok(value),
            Self::Leaf(spec) => match spec.check(&value) {
                Ok(()) => Ok(value),
                Err(reason) => Err(SchemaViolation::InvalidValue {
                    field: field.to_owned(),
                    kind: spec.kind(),
                    value,
                    reason,
                }
                .into()),
            },
            Self::Struct(_) => Err(PayloadError::ShapeConflict {
                field: field.to_owned(),
                expected: NodeKind::Leaf,
                found: NodeKind::Struct,
            }),
        }
    }

    fn struct_schema(self, field: &str) -> Result<Option<&'s ConfigDefinition>, PayloadError> {
        match self {
            Self::Unbound => Ok(None),
            Self::Struct(def) => Ok(Some(def)),
            Self::Leaf(_) => Err(PayloadError::ShapeConflict {
                field: field.to_owned(),
                expected: NodeKind::Struct,
                found: NodeKind::Leaf,
            }),
        }
    }
}

fn category_error(field: &str, expected: FieldCategory, found: Option<&FieldDef>) -> PayloadError {
    match found {
        Some(def) => SchemaViolation::WrongCategory {
            field: field.to_owned(),
            expected,
            found: def.category(),
        },
        None => SchemaViolation::UnknownField {
            field: field.to_owned(),
        },
    }
    .into()
}

/// One node of the payload tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadNode<'s> {
    /// String-encoded scalar value.
    Leaf(String),
    /// Nested struct.
    Struct(PayloadBuilder<'s>),
    /// Array of leaves or structs.
    Array(ArrayBuilder<'s>),
    /// Keyed leaves or structs.
    Map(MapBuilder<'s>),
}

impl PayloadNode<'_> {
    /// Shape of this node.
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Struct(_) => NodeKind::Struct,
            Self::Array(_) => NodeKind::Array,
            Self::Map(_) => NodeKind::Map,
        }
    }

    /// Leaf text, if this node is a leaf.
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Materialize this node into a document value. Array gaps become `null`.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Leaf(value) => Value::String(value.clone()),
            Self::Struct(builder) => builder.resolve(),
            Self::Array(array) => Value::Array(
                array
                    .elements
                    .iter()
                    .map(|slot| slot.as_ref().map_or(Value::Null, PayloadNode::resolve))
                    .collect(),
            ),
            Self::Map(map) => Value::Object(
                map.entries
                    .iter()
                    .map(|(key, node)| (key.clone(), node.resolve()))
                    .collect(),
            ),
        }
    }
}

/// Struct-like payload node, optionally bound to a schema.
///
/// A builder reached through [`PayloadBuilder::get_object`] on a struct-map
/// field is *keyed*: its field names are map keys and every field is a
/// struct bound to the map's entry schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadBuilder<'s> {
    pub(crate) schema: Option<&'s ConfigDefinition>,
    pub(crate) entries: Option<&'s ConfigDefinition>,
    pub(crate) fields: FieldTable<PayloadNode<'s>>,
}

impl<'s> PayloadBuilder<'s> {
    /// Empty unbound builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty builder bound to `schema`.
    pub fn bound(schema: &'s ConfigDefinition) -> Self {
        Self::from_schema(Some(schema))
    }

    pub(crate) fn from_schema(schema: Option<&'s ConfigDefinition>) -> Self {
        Self {
            schema,
            entries: None,
            fields: FieldTable::new(),
        }
    }

    pub(crate) fn keyed(entries: &'s ConfigDefinition) -> Self {
        Self {
            schema: None,
            entries: Some(entries),
            fields: FieldTable::new(),
        }
    }

    /// Empty builder with the same binding as `self`.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            schema: self.schema,
            entries: self.entries,
            fields: FieldTable::new(),
        }
    }

    /// Schema this builder is bound to, if any.
    pub const fn schema(&self) -> Option<&'s ConfigDefinition> {
        self.schema
    }

    /// Entry schema when this builder stands for a struct map.
    pub const fn entry_schema(&self) -> Option<&'s ConfigDefinition> {
        self.entries
    }

    /// Keyed builders only hold struct entries.
    fn reject_keyed(&self, name: &str, found: NodeKind) -> Result<(), PayloadError> {
        match self.entries {
            Some(_) => Err(PayloadError::ShapeConflict {
                field: name.to_owned(),
                expected: NodeKind::Struct,
                found,
            }),
            None => Ok(()),
        }
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field has been written.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Child node named `name`.
    pub fn field(&self, name: &str) -> Option<&PayloadNode<'s>> {
        self.fields.get(name)
    }

    /// Leaf text of `name`, if it is a present leaf.
    pub fn leaf(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(PayloadNode::as_leaf)
    }

    /// Present fields in first-write order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &PayloadNode<'s>)> {
        self.fields.iter()
    }

    /// Set or overwrite a leaf. Bound builders validate `value` against the
    /// declared leaf.
    pub fn set_field(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<&mut Self, PayloadError> {
        self.reject_keyed(name, NodeKind::Leaf)?;
        let value = value.into();
        let value = match self.schema {
            Some(def) => match def.field(name) {
                Some(FieldDef::Leaf(spec)) => Element::Leaf(spec).leaf_value(name, value)?,
                other => return Err(category_error(name, FieldCategory::Leaf, other)),
            },
            None => value,
        };
        if let Some(existing) = self.fields.get(name) {
            if existing.kind() != NodeKind::Leaf {
                return Err(PayloadError::ShapeConflict {
                    field: name.to_owned(),
                    expected: NodeKind::Leaf,
                    found: existing.kind(),
                });
            }
        }
        self.fields.insert(name, PayloadNode::Leaf(value));
        Ok(self)
    }

    /// Child struct builder, created empty on first access.
    ///
    /// Bound builders accept struct and struct-map fields. A struct-map field
    /// yields a keyed builder whose `get_object(key)` returns the entry for
    /// `key`. A field already populated through [`Self::get_map`] keeps its
    /// map node and is reported as a shape conflict here.
    pub fn get_object(&mut self, name: &str) -> Result<&mut Self, PayloadError> {
        let child = match (self.entries, self.schema) {
            (Some(entry), _) => Self::from_schema(Some(entry)),
            (None, Some(def)) => match def.field(name) {
                Some(FieldDef::Struct(child)) => Self::from_schema(Some(child)),
                Some(FieldDef::StructMap(child)) => Self::keyed(child),
                other => return Err(category_error(name, FieldCategory::Struct, other)),
            },
            (None, None) => Self::new(),
        };
        match self
            .fields
            .get_or_insert_with(name, move || PayloadNode::Struct(child))
        {
            PayloadNode::Struct(child) => Ok(child),
            other => Err(PayloadError::ShapeConflict {
                field: name.to_owned(),
                expected: NodeKind::Struct,
                found: other.kind(),
            }),
        }
    }

    /// Array builder, created empty on first access. Bound builders require
    /// an array or inner-array field.
    pub fn get_array(&mut self, name: &str) -> Result<&mut ArrayBuilder<'s>, PayloadError> {
        self.reject_keyed(name, NodeKind::Array)?;
        let element = match self.schema {
            Some(def) => match def.field(name) {
                Some(FieldDef::Array(spec)) => Element::Leaf(spec),
                Some(FieldDef::InnerArray(child)) => Element::Struct(child),
                other => return Err(category_error(name, FieldCategory::Array, other)),
            },
            None => Element::Unbound,
        };
        match self
            .fields
            .get_or_insert_with(name, || PayloadNode::Array(ArrayBuilder::new(name, element)))
        {
            PayloadNode::Array(array) => Ok(array),
            other => Err(PayloadError::ShapeConflict {
                field: name.to_owned(),
                expected: NodeKind::Array,
                found: other.kind(),
            }),
        }
    }

    /// Map builder, created empty on first access. Bound builders require a
    /// leaf-map or struct-map field.
    pub fn get_map(&mut self, name: &str) -> Result<&mut MapBuilder<'s>, PayloadError> {
        self.reject_keyed(name, NodeKind::Map)?;
        let element = match self.schema {
            Some(def) => match def.field(name) {
                Some(FieldDef::LeafMap(spec)) => Element::Leaf(spec),
                Some(FieldDef::StructMap(child)) => Element::Struct(child),
                other => return Err(category_error(name, FieldCategory::LeafMap, other)),
            },
            None => Element::Unbound,
        };
        match self
            .fields
            .get_or_insert_with(name, || PayloadNode::Map(MapBuilder::new(name, element)))
        {
            PayloadNode::Map(map) => Ok(map),
            other => Err(PayloadError::ShapeConflict {
                field: name.to_owned(),
                expected: NodeKind::Map,
                found: other.kind(),
            }),
        }
    }

    /// Element schema the bound definition declares for array or map `name`.
    pub(crate) fn complex_element(&self, name: &str) -> Option<Element<'s>> {
        match self.schema?.field(name)? {
            FieldDef::Array(spec) | FieldDef::LeafMap(spec) => Some(Element::Leaf(spec)),
            FieldDef::InnerArray(child) | FieldDef::StructMap(child) => Some(Element::Struct(child)),
            FieldDef::Leaf(_) | FieldDef::Struct(_) => None,
        }
    }

    /// Materialize into a fresh document object.
    pub fn resolve(&self) -> Document {
        let mut sink = Map::new();
        self.resolve_into(&mut sink);
        Value::Object(sink)
    }

    /// Write every present field into `sink`, overwriting same-named entries.
    pub fn resolve_into(&self, sink: &mut Map<String, Value>) {
        for (name, node) in self.fields.iter() {
            sink.insert(name.to_owned(), node.resolve());
        }
    }
}

/// Array node. Its [`ArrayMode`] is fixed on first mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBuilder<'s> {
    pub(crate) name: String,
    pub(crate) element: Element<'s>,
    pub(crate) mode: ArrayMode,
    pub(crate) elements: Vec<Option<PayloadNode<'s>>>,
}

impl<'s> ArrayBuilder<'s> {
    pub(crate) fn new(name: &str, element: Element<'s>) -> Self {
        Self {
            name: name.to_owned(),
            element,
            mode: ArrayMode::Unset,
            elements: Vec::new(),
        }
    }

    /// Current access mode.
    pub const fn mode(&self) -> ArrayMode {
        self.mode
    }

    /// Number of slots, gaps included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` when no slot exists.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`; `None` for gaps and out-of-range indices.
    pub fn element(&self, index: usize) -> Option<&PayloadNode<'s>> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    /// Slots in order; gaps yield `None`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&PayloadNode<'s>>> {
        self.elements.iter().map(Option::as_ref)
    }

    fn check_index(&self, index: usize) -> Result<(), PayloadError> {
        if index < MAX_ARRAY_LEN {
            Ok(())
        } else {
            Err(PayloadError::IndexOutOfRange {
                field: self.name.clone(),
                index,
                limit: MAX_ARRAY_LEN,
            })
        }
    }

    fn claim(&self, wanted: ArrayMode, attempted: &'static str) -> Result<(), PayloadError> {
        if self.mode == ArrayMode::Unset || self.mode == wanted {
            Ok(())
        } else {
            Err(PayloadError::StructuralConflict {
                field: self.name.clone(),
                mode: self.mode,
                attempted,
            })
        }
    }

    /// Append a leaf element.
    pub fn append(&mut self, value: impl Into<String>) -> Result<(), PayloadError> {
        self.claim(ArrayMode::Append, "append")?;
        self.check_index(self.elements.len())?;
        let value = self.element.leaf_value(&self.name, value.into())?;
        self.mode = ArrayMode::Append;
        self.elements.push(Some(PayloadNode::Leaf(value)));
        Ok(())
    }

    /// Append an empty struct element and return it.
    pub fn append_struct(&mut self) -> Result<&mut PayloadBuilder<'s>, PayloadError> {
        self.claim(ArrayMode::Append, "append")?;
        self.check_index(self.elements.len())?;
        let schema = self.element.struct_schema(&self.name)?;
        self.mode = ArrayMode::Append;
        let index = self.elements.len();
        self.fill_struct(index, schema)
    }

    /// Write a leaf at `index`, leaving gaps before it if needed.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> Result<(), PayloadError> {
        self.claim(ArrayMode::Indexed, "set")?;
        self.check_index(index)?;
        let value = self.element.leaf_value(&self.name, value.into())?;
        self.mode = ArrayMode::Indexed;
        self.grow(index);
        self.elements[index] = Some(PayloadNode::Leaf(value));
        Ok(())
    }

    /// Struct element at `index`, created if the slot is empty.
    pub fn set_struct(&mut self, index: usize) -> Result<&mut PayloadBuilder<'s>, PayloadError> {
        self.claim(ArrayMode::Indexed, "set")?;
        self.check_index(index)?;
        let schema = self.element.struct_schema(&self.name)?;
        self.mode = ArrayMode::Indexed;
        self.fill_struct(index, schema)
    }

    /// Mode-dependent struct access: appends when unset, returns the element
    /// at that ordinal in append mode (growing as needed), and behaves like
    /// [`Self::set_struct`] in indexed mode.
    pub fn get(&mut self, index: usize) -> Result<&mut PayloadBuilder<'s>, PayloadError> {
        let schema = self.element.struct_schema(&self.name)?;
        match self.mode {
            ArrayMode::Unset => {
                let next = self.elements.len();
                self.check_index(next)?;
                self.mode = ArrayMode::Append;
                self.fill_struct(next, schema)
            }
            ArrayMode::Append => {
                self.check_index(index)?;
                if self.elements.len() <= index {
                    self.elements.resize_with(index + 1, || {
                        Some(PayloadNode::Struct(PayloadBuilder::from_schema(schema)))
                    });
                }
                self.fill_struct(index, schema)
            }
            ArrayMode::Indexed => {
                self.check_index(index)?;
                self.fill_struct(index, schema)
            }
        }
    }

    /// Callers check `index` against [`MAX_ARRAY_LEN`] first.
    fn grow(&mut self, index: usize) {
        if self.elements.len() <= index {
            self.elements.resize_with(index + 1, || None);
        }
    }

    fn fill_struct(
        &mut self,
        index: usize,
        schema: Option<&'s ConfigDefinition>,
    ) -> Result<&mut PayloadBuilder<'s>, PayloadError> {
        if let Some(Some(node)) = self.elements.get(index) {
            if node.kind() != NodeKind::Struct {
                return Err(PayloadError::ShapeConflict {
                    field: format!("{}[{index}]", self.name),
                    expected: NodeKind::Struct,
                    found: node.kind(),
                });
            }
        }
        self.grow(index);
        match self.elements[index]
            .get_or_insert_with(|| PayloadNode::Struct(PayloadBuilder::from_schema(schema)))
        {
            PayloadNode::Struct(builder) => Ok(builder),
            other => Err(PayloadError::ShapeConflict {
                field: format!("{}[{index}]", self.name),
                expected: NodeKind::Struct,
                found: other.kind(),
            }),
        }
    }
}

/// Map node: last write wins per key, iteration is key-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapBuilder<'s> {
    pub(crate) name: String,
    pub(crate) element: Element<'s>,
    pub(crate) entries: BTreeMap<String, PayloadNode<'s>>,
}

impl<'s> MapBuilder<'s> {
    pub(crate) fn new(name: &str, element: Element<'s>) -> Self {
        Self {
            name: name.to_owned(),
            element,
            entries: BTreeMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PayloadNode<'s>> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadNode<'s>)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Insert or overwrite a leaf entry.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), PayloadError> {
        let value = self.element.leaf_value(&self.name, value.into())?;
        self.entries.insert(key.into(), PayloadNode::Leaf(value));
        Ok(())
    }

    /// Struct entry under `key`, created empty if absent.
    pub fn put_struct(&mut self, key: &str) -> Result<&mut PayloadBuilder<'s>, PayloadError> {
        let schema = self.element.struct_schema(&self.name)?;
        match self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| PayloadNode::Struct(PayloadBuilder::from_schema(schema)))
        {
            PayloadNode::Struct(builder) => Ok(builder),
            other => Err(PayloadError::ShapeConflict {
                field: format!("{}{{\"{key}\"}}", self.name),
                expected: NodeKind::Struct,
                found: other.kind(),
            }),
        }
    }
}
