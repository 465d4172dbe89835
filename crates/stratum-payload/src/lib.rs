// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Payload side of Stratum configuration: building values against a schema,
//! merging fragments, backfilling defaults, encoding to the flat text wire
//! format, and binding into typed instances.
//!
//! Documents are plain [`serde_json::Value`] trees (aliased as [`Document`]).
//! Object keys are kept sorted, which makes every traversal and every encoded
//! output deterministic.
//!
//! # Flow
//!
//! 1. Fragments are loaded into [`PayloadBuilder`]s and combined with
//!    [`PayloadBuilder::merge_override`].
//! 2. [`PayloadBuilder::resolve`] materializes the merged tree.
//! 3. [`apply_defaults`] fills absent leaves from the schema.
//! 4. [`TextEncoder`] renders `path value` lines, or [`bind`] produces a typed
//!    [`ConfigInstance`].
#![forbid(unsafe_code)]

mod binder;
mod builder;
mod defaults;
mod document;
mod encoder;
mod error;
mod merge;

pub use binder::{
    bind, bind_or_default, parse_bool, parse_f64, parse_leaf, populate, BindError, ConfigInstance,
    InstanceBuilder, LeafSetter, SetterTable,
};
pub use builder::{
    ArrayBuilder, ArrayMode, MapBuilder, PayloadBuilder, PayloadNode, MAX_ARRAY_LEN,
};
pub use defaults::{apply_defaults, typed_default};
pub use document::leaf_text;
pub use encoder::{quote, EncodeError, EncoderOptions, TextEncoder};
pub use error::{NodeKind, PayloadError};

/// Generic value tree used for resolved payloads.
pub type Document = serde_json::Value;
