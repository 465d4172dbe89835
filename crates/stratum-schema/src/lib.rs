// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema tree for Stratum configuration definitions.
//!
//! A definition declares typed fields — leaves (bool, int, long, double,
//! string, enum, reference, file), leaf arrays, inner arrays of structs,
//! structs, leaf maps and struct maps — together with defaults, numeric ranges
//! and enum value sets. The payload builder, defaults applier and text encoder
//! in `stratum-payload` are all driven by this tree.
//!
//! # Invariants
//!
//! - Field names are unique within one definition node across all categories.
//! - Numeric leaves carry the full range of their kind unless narrowed.
//! - Enum leaves declare at least one value; every declared default passes the
//!   leaf's own verification.
//! - Iteration over fields follows declaration order.
#![forbid(unsafe_code)]

mod definition;
mod error;
mod leaf;
mod parser;
mod table;
mod version;

pub use definition::{ConfigDefinition, ConfigDefinitionKey, FieldDef, DEFAULT_NAMESPACE};
pub use error::{FieldCategory, SchemaError, SchemaViolation, ValueError};
pub use leaf::{format_double, parse_double, LeafKind, LeafSpec, NumericRange};
pub use parser::parse_definition;
pub use table::FieldTable;
pub use version::{DefVersion, VersionComparator};
