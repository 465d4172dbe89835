// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures and test doubles for Stratum crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`defs`] - Definition sources and their parsed schemas
//! - [`documents`] - Sample documents matching those schemas
//! - [`instance`] - A typed instance written the way generated code looks
//! - [`supplier`] - Call-counting cache suppliers

pub mod defs;
pub mod documents;
pub mod instance;
pub mod supplier;

pub use defs::{nested_schema, simple_schema, NESTED_DEF, SIMPLE_DEF};
pub use documents::{nested_document, simple_document};
pub use instance::{Enumval, Gender, Inner, Nested, NestedConfig, Simple};
pub use supplier::CountingSupplier;
