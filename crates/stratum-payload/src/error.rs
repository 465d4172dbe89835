// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised by payload builder operations.

use stratum_schema::SchemaViolation;
use thiserror::Error;

use crate::builder::ArrayMode;

/// Shape of a payload builder node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// String-encoded scalar.
    Leaf,
    /// Named fields.
    Struct,
    /// Ordered elements.
    Array,
    /// Keyed entries.
    Map,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Leaf => "leaf",
            Self::Struct => "struct",
            Self::Array => "array",
            Self::Map => "map",
        })
    }
}

/// Failure of a single builder operation. The builder is left exactly as it
/// was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Unknown field, wrong field category, or a literal rejected by its leaf.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
    /// Append after indexed access, or indexed access after append.
    #[error("array '{field}' is fixed to {mode} mode; {attempted} is not allowed")]
    StructuralConflict {
        /// Array field name.
        field: String,
        /// Mode the array was fixed to by its first mutation.
        mode: ArrayMode,
        /// Rejected operation.
        attempted: &'static str,
    },
    /// An existing node (or a document value) has a different shape than the
    /// operation needs.
    #[error("field '{field}' holds a {found}, expected a {expected}")]
    ShapeConflict {
        /// Field name or element path.
        field: String,
        /// Shape the operation needs.
        expected: NodeKind,
        /// Shape actually present.
        found: NodeKind,
    },
    /// An array index at or beyond [`crate::MAX_ARRAY_LEN`].
    #[error("index {index} of array '{field}' exceeds the limit of {limit} elements")]
    IndexOutOfRange {
        /// Array field name.
        field: String,
        /// Rejected index.
        index: usize,
        /// Maximum number of elements an array may hold.
        limit: usize,
    },
}
