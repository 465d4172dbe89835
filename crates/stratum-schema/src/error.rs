// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for schema construction and value verification.

use thiserror::Error;

use crate::leaf::LeafKind;

/// Category of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    /// Scalar leaf (bool, numeric, string, enum, reference, file).
    Leaf,
    /// Array of leaves.
    Array,
    /// Array of structs.
    InnerArray,
    /// Nested struct.
    Struct,
    /// Map from string keys to leaves.
    LeafMap,
    /// Map from string keys to structs.
    StructMap,
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Leaf => "leaf",
            Self::Array => "array",
            Self::InnerArray => "inner array",
            Self::Struct => "struct",
            Self::LeafMap => "leaf map",
            Self::StructMap => "struct map",
        };
        f.write_str(label)
    }
}

/// Why a literal was rejected by a leaf's constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Bool leaves accept exactly `true` or `false`.
    #[error("not a boolean literal")]
    NotBool,
    /// Int/long leaves require a base-10 integer.
    #[error("not a base-10 integer")]
    NotInteger,
    /// Double leaves require a decimal number or `Infinity`/`-Infinity`.
    #[error("not a number")]
    NotDouble,
    /// Numeric value outside the declared range (bounds rendered as text).
    #[error("out of range [{min}, {max}]")]
    OutOfRange {
        /// Lower bound (inclusive).
        min: String,
        /// Upper bound (inclusive).
        max: String,
    },
    /// Enum literal that is not one of the declared values.
    #[error("not one of the declared enum values")]
    NotEnumMember,
}

/// A builder operation or `verify` call violated the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// The path does not name a declared field.
    #[error("unknown field '{field}'")]
    UnknownField {
        /// Offending path.
        field: String,
    },
    /// The path names a field of a different category than required.
    #[error("field '{field}' is a {found}, expected {expected}")]
    WrongCategory {
        /// Offending path.
        field: String,
        /// Category the operation needs.
        expected: FieldCategory,
        /// Category actually declared.
        found: FieldCategory,
    },
    /// `verify(path)` on a field that is not struct/array/map shaped.
    #[error("field '{field}' is not a complex field")]
    NotComplex {
        /// Offending path.
        field: String,
    },
    /// Literal rejected by the leaf's type, range or enum constraint.
    #[error("invalid {kind} value '{value}' for field '{field}': {reason}")]
    InvalidValue {
        /// Offending path.
        field: String,
        /// Declared leaf kind.
        kind: LeafKind,
        /// Rejected literal.
        value: String,
        /// Constraint that failed.
        #[source]
        reason: ValueError,
    },
}

/// Errors raised while building or parsing a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Field names are unique within one definition node.
    #[error("duplicate field '{0}'")]
    DuplicateField(String),
    /// Enum leaves need at least one value.
    #[error("enum field '{0}' declares no values")]
    EmptyEnum(String),
    /// Declared default does not satisfy the leaf's own constraints.
    #[error("invalid default for field '{field}': {reason}")]
    InvalidDefault {
        /// Field carrying the default.
        field: String,
        /// Constraint that failed.
        #[source]
        reason: ValueError,
    },
    /// Range bounds unparseable, inverted, or declared on a non-numeric leaf.
    #[error("invalid range for field '{field}': {message}")]
    InvalidRange {
        /// Field carrying the range.
        field: String,
        /// Detail.
        message: String,
    },
    /// Version string with a non-numeric component.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    /// Syntax or semantic error in `.def` source.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based source line.
        line: usize,
        /// Detail.
        message: String,
    },
}
