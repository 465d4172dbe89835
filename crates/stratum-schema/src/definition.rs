// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema tree: a configuration definition and its nested field declarations.
//!
//! A [`ConfigDefinition`] is built once (programmatically or through
//! [`crate::parse_definition`]) and then only read. Every field lives in one
//! name-keyed [`FieldTable`], which enforces name uniqueness across all field
//! categories and preserves declaration order for the defaults applier and
//! the text encoder.

use crate::error::{FieldCategory, SchemaError, SchemaViolation};
use crate::leaf::LeafSpec;
use crate::table::FieldTable;

/// Namespace assumed when a definition does not declare one.
pub const DEFAULT_NAMESPACE: &str = "config";

/// Identity of a definition: `(name, namespace)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigDefinitionKey {
    /// Definition name.
    pub name: String,
    /// Definition namespace.
    pub namespace: String,
}

impl ConfigDefinitionKey {
    /// Build a key from its parts.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for ConfigDefinitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDef {
    /// Scalar leaf.
    Leaf(LeafSpec),
    /// Array whose elements follow the given leaf spec.
    Array(LeafSpec),
    /// Array of structs.
    InnerArray(ConfigDefinition),
    /// Nested struct.
    Struct(ConfigDefinition),
    /// String-keyed map of leaves.
    LeafMap(LeafSpec),
    /// String-keyed map of structs.
    StructMap(ConfigDefinition),
}

impl FieldDef {
    /// Category tag of this field.
    pub const fn category(&self) -> FieldCategory {
        match self {
            Self::Leaf(_) => FieldCategory::Leaf,
            Self::Array(_) => FieldCategory::Array,
            Self::InnerArray(_) => FieldCategory::InnerArray,
            Self::Struct(_) => FieldCategory::Struct,
            Self::LeafMap(_) => FieldCategory::LeafMap,
            Self::StructMap(_) => FieldCategory::StructMap,
        }
    }

    /// Returns `true` for every category except plain leaves.
    pub const fn is_complex(&self) -> bool {
        !matches!(self, Self::Leaf(_))
    }

    /// Child schema for struct-shaped fields.
    pub const fn child(&self) -> Option<&ConfigDefinition> {
        match self {
            Self::InnerArray(def) | Self::Struct(def) | Self::StructMap(def) => Some(def),
            _ => None,
        }
    }

    /// Leaf spec for leaf-shaped fields (the element spec for arrays and maps).
    pub const fn leaf_spec(&self) -> Option<&LeafSpec> {
        match self {
            Self::Leaf(spec) | Self::Array(spec) | Self::LeafMap(spec) => Some(spec),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum ChildKind {
    Struct,
    InnerArray,
    StructMap,
}

/// A configuration definition (the root of a schema tree, or a nested struct).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDefinition {
    name: String,
    namespace: String,
    version: Option<String>,
    fields: FieldTable<FieldDef>,
}

impl ConfigDefinition {
    /// Empty definition in the default namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_namespace(name, DEFAULT_NAMESPACE)
    }

    /// Empty definition in `namespace`.
    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            version: None,
            fields: FieldTable::new(),
        }
    }

    /// Definition (or struct field) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace; nested structs inherit their parent's.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Declared version string, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `(name, namespace)` identity.
    pub fn key(&self) -> ConfigDefinitionKey {
        ConfigDefinitionKey::new(&self.name, &self.namespace)
    }

    /// Replace the namespace of this node and every nested struct.
    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        for (_, field) in self.fields.iter_mut() {
            match field {
                FieldDef::InnerArray(def) | FieldDef::Struct(def) | FieldDef::StructMap(def) => {
                    def.set_namespace(namespace.clone());
                }
                _ => {}
            }
        }
        self.namespace = namespace;
    }

    /// Set the version string.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    /// Declare a scalar leaf.
    pub fn add_leaf(&mut self, name: &str, spec: LeafSpec) -> Result<&mut Self, SchemaError> {
        self.add_leaf_shaped(name, spec, FieldDef::Leaf)
    }

    /// Declare an array of leaves.
    pub fn add_array(&mut self, name: &str, element: LeafSpec) -> Result<&mut Self, SchemaError> {
        self.add_leaf_shaped(name, element, FieldDef::Array)
    }

    /// Declare a map of leaves.
    pub fn add_leaf_map(
        &mut self,
        name: &str,
        element: LeafSpec,
    ) -> Result<&mut Self, SchemaError> {
        self.add_leaf_shaped(name, element, FieldDef::LeafMap)
    }

    /// Declare a nested struct and return its (empty) schema for population.
    pub fn add_struct(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.reject_duplicate(name)?;
        self.child_entry(name, ChildKind::Struct)
    }

    /// Declare an array of structs and return the element schema.
    pub fn add_inner_array(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.reject_duplicate(name)?;
        self.child_entry(name, ChildKind::InnerArray)
    }

    /// Declare a map of structs and return the value schema.
    pub fn add_struct_map(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.reject_duplicate(name)?;
        self.child_entry(name, ChildKind::StructMap)
    }

    /// Get-or-declare a nested struct. Used by the parser where several
    /// lines share a prefix.
    pub(crate) fn struct_entry(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.child_entry(name, ChildKind::Struct)
    }

    pub(crate) fn inner_array_entry(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.child_entry(name, ChildKind::InnerArray)
    }

    pub(crate) fn struct_map_entry(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        self.child_entry(name, ChildKind::StructMap)
    }

    fn add_leaf_shaped(
        &mut self,
        name: &str,
        spec: LeafSpec,
        wrap: fn(LeafSpec) -> FieldDef,
    ) -> Result<&mut Self, SchemaError> {
        self.reject_duplicate(name)?;
        spec.validate(name)?;
        self.fields.insert(name, wrap(spec));
        Ok(self)
    }

    fn reject_duplicate(&self, name: &str) -> Result<(), SchemaError> {
        if self.fields.contains(name) {
            return Err(SchemaError::DuplicateField(name.to_owned()));
        }
        Ok(())
    }

    fn child_entry(&mut self, name: &str, kind: ChildKind) -> Result<&mut Self, SchemaError> {
        let namespace = self.namespace.clone();
        let field = self.fields.get_or_insert_with(name, || {
            let child = Self::with_namespace(name, namespace);
            match kind {
                ChildKind::Struct => FieldDef::Struct(child),
                ChildKind::InnerArray => FieldDef::InnerArray(child),
                ChildKind::StructMap => FieldDef::StructMap(child),
            }
        });
        match (kind, field) {
            (ChildKind::Struct, FieldDef::Struct(def))
            | (ChildKind::InnerArray, FieldDef::InnerArray(def))
            | (ChildKind::StructMap, FieldDef::StructMap(def)) => Ok(def),
            _ => Err(SchemaError::DuplicateField(name.to_owned())),
        }
    }

    /// Any declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter()
    }

    /// Number of declared fields in this node.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Scalar leaf lookup.
    pub fn leaf(&self, name: &str) -> Option<&LeafSpec> {
        match self.fields.get(name) {
            Some(FieldDef::Leaf(spec)) => Some(spec),
            _ => None,
        }
    }

    /// Leaf-array lookup (returns the element spec).
    pub fn array(&self, name: &str) -> Option<&LeafSpec> {
        match self.fields.get(name) {
            Some(FieldDef::Array(spec)) => Some(spec),
            _ => None,
        }
    }

    /// Inner-array lookup (returns the element schema).
    pub fn inner_array(&self, name: &str) -> Option<&Self> {
        match self.fields.get(name) {
            Some(FieldDef::InnerArray(def)) => Some(def),
            _ => None,
        }
    }

    /// Struct lookup.
    pub fn struct_def(&self, name: &str) -> Option<&Self> {
        match self.fields.get(name) {
            Some(FieldDef::Struct(def)) => Some(def),
            _ => None,
        }
    }

    /// Leaf-map lookup (returns the value spec).
    pub fn leaf_map(&self, name: &str) -> Option<&LeafSpec> {
        match self.fields.get(name) {
            Some(FieldDef::LeafMap(spec)) => Some(spec),
            _ => None,
        }
    }

    /// Struct-map lookup (returns the value schema).
    pub fn struct_map(&self, name: &str) -> Option<&Self> {
        match self.fields.get(name) {
            Some(FieldDef::StructMap(def)) => Some(def),
            _ => None,
        }
    }

    /// Resolve a dotted path (`outer.inner.leaf`) through nested structs.
    pub fn resolve_path(&self, path: &str) -> Result<&FieldDef, SchemaViolation> {
        let unknown = || SchemaViolation::UnknownField {
            field: path.to_owned(),
        };
        let mut node = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let field = node.fields.get(segment).ok_or_else(unknown)?;
            if segments.peek().is_none() {
                return Ok(field);
            }
            match field {
                FieldDef::Struct(def) => node = def,
                other => {
                    return Err(SchemaViolation::WrongCategory {
                        field: path.to_owned(),
                        expected: FieldCategory::Struct,
                        found: other.category(),
                    })
                }
            }
        }
        Err(unknown())
    }

    /// Validate `value` against the leaf named by `path`.
    pub fn verify(&self, path: &str, value: &str) -> Result<(), SchemaViolation> {
        match self.resolve_path(path)? {
            FieldDef::Leaf(spec) => spec.check(value).map_err(|reason| {
                SchemaViolation::InvalidValue {
                    field: path.to_owned(),
                    kind: spec.kind(),
                    value: value.to_owned(),
                    reason,
                }
            }),
            other => Err(SchemaViolation::WrongCategory {
                field: path.to_owned(),
                expected: FieldCategory::Leaf,
                found: other.category(),
            }),
        }
    }

    /// Validate that `path` names a struct, array, inner array or map.
    /// Contents are not inspected.
    pub fn verify_complex(&self, path: &str) -> Result<(), SchemaViolation> {
        if self.resolve_path(path)?.is_complex() {
            Ok(())
        } else {
            Err(SchemaViolation::NotComplex {
                field: path.to_owned(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::leaf::LeafKind;

    fn sample() -> ConfigDefinition {
        let mut def = ConfigDefinition::with_namespace("sample", "test");
        def.add_leaf("flag", LeafSpec::bool().with_default("false"))
            .unwrap()
            .add_leaf("count", LeafSpec::int().with_int_range(0, 10))
            .unwrap();
        def.add_struct("simple")
            .unwrap()
            .add_leaf("name", LeafSpec::string())
            .unwrap();
        def.add_inner_array("rows")
            .unwrap()
            .add_leaf("id", LeafSpec::long())
            .unwrap();
        def.add_array("tags", LeafSpec::string()).unwrap();
        def
    }

    #[test]
    fn names_are_unique_across_categories() {
        let mut def = sample();
        assert_eq!(
            def.add_struct("flag").err(),
            Some(SchemaError::DuplicateField("flag".to_owned()))
        );
        assert!(def.add_leaf("rows", LeafSpec::int()).is_err());
        assert!(def.add_leaf_map("tags", LeafSpec::int()).is_err());
    }

    #[test]
    fn category_lookups_are_exclusive() {
        let def = sample();
        assert!(def.leaf("flag").is_some());
        assert!(def.struct_def("flag").is_none());
        assert!(def.inner_array("rows").is_some());
        assert!(def.array("rows").is_none());
        assert_eq!(def.array("tags").map(LeafSpec::kind), Some(LeafKind::String));
    }

    #[test]
    fn verify_resolves_dotted_paths() {
        let def = sample();
        assert!(def.verify("simple.name", "anything").is_ok());
        assert!(matches!(
            def.verify("simple.missing", "x"),
            Err(SchemaViolation::UnknownField { .. })
        ));
        assert!(matches!(
            def.verify("rows.id", "1"),
            Err(SchemaViolation::WrongCategory { .. })
        ));
    }

    #[test]
    fn verify_complex_only_checks_category() {
        let def = sample();
        assert!(def.verify_complex("simple").is_ok());
        assert!(def.verify_complex("rows").is_ok());
        assert!(def.verify_complex("tags").is_ok());
        assert_eq!(
            def.verify_complex("flag"),
            Err(SchemaViolation::NotComplex {
                field: "flag".to_owned()
            })
        );
        assert!(def.verify_complex("nope").is_err());
    }

    #[test]
    fn nested_structs_inherit_namespace() {
        let mut def = sample();
        assert_eq!(def.struct_def("simple").unwrap().namespace(), "test");
        def.set_namespace("other");
        assert_eq!(def.inner_array("rows").unwrap().namespace(), "other");
        assert_eq!(def.key().to_string(), "other.sample");
    }

    #[test]
    fn declaration_order_is_preserved() {
        let def = sample();
        let names: Vec<_> = def.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["flag", "count", "simple", "rows", "tags"]);
    }
}
