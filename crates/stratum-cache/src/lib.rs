// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serving side of Stratum configuration: cache keys, checksummed
//! generation-stamped payloads ([`RawConfig`]), a single-flight
//! [`ConfigCache`], and the [`ConfigResolver`] that ties definitions,
//! deployment fragments and the cache together.
//!
//! Resolved payloads are handed out as `Arc<RawConfig>` and never mutated,
//! so readers need no synchronization.
#![forbid(unsafe_code)]

mod cache;
mod checksum;
mod key;
mod raw_config;
mod resolver;

pub use cache::{CacheStats, ConfigCache};
pub use checksum::{canonical_json, definition_md5, PayloadChecksums};
pub use key::{ConfigCacheKey, ConfigKey};
pub use raw_config::RawConfig;
pub use resolver::{
    ConfigResolver, DefinitionRegistry, Fragments, RegisteredDefinition, ResolveError,
    ResolverOptions,
};
