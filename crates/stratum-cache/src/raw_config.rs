// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resolved, generation-stamped configuration payloads.

use serde_json::{Map, Value};
use stratum_payload::Document;

use crate::checksum::PayloadChecksums;
use crate::key::{ConfigCacheKey, ConfigKey};

/// A resolved configuration at one generation.
///
/// Immutable once built; a redeploy produces a new value rather than
/// mutating this one. Equality covers every field, so equal content at two
/// generations compares unequal.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    key: ConfigKey,
    def_md5: Option<String>,
    payload: Document,
    checksums: PayloadChecksums,
    generation: i64,
    error_code: Option<i32>,
    def_content: Vec<String>,
    platform_version: Option<String>,
}

impl RawConfig {
    /// Wrap `payload`, computing its checksums.
    pub fn new(key: ConfigKey, def_md5: Option<String>, payload: Document, generation: i64) -> Self {
        let checksums = PayloadChecksums::from_payload(&payload);
        Self {
            key,
            def_md5,
            payload,
            checksums,
            generation,
            error_code: None,
            def_content: Vec::new(),
            platform_version: None,
        }
    }

    /// Error payload: empty object content carrying `code`.
    pub fn error(key: ConfigKey, def_md5: Option<String>, generation: i64, code: i32) -> Self {
        Self {
            error_code: Some(code),
            ..Self::new(key, def_md5, Value::Object(Map::new()), generation)
        }
    }

    /// Attach the definition source lines the payload was resolved against.
    #[must_use]
    pub fn with_def_content(mut self, lines: Vec<String>) -> Self {
        self.def_content = lines;
        self
    }

    /// Attach the platform version that produced the payload.
    #[must_use]
    pub fn with_platform_version(mut self, version: Option<String>) -> Self {
        self.platform_version = version;
        self
    }

    /// Configuration identity.
    pub const fn key(&self) -> &ConfigKey {
        &self.key
    }

    /// Cache key for this payload.
    pub fn cache_key(&self) -> ConfigCacheKey {
        ConfigCacheKey::new(self.key.clone(), self.def_md5.clone())
    }

    /// Checksum of the definition the payload was resolved against.
    pub fn def_md5(&self) -> Option<&str> {
        self.def_md5.as_deref()
    }

    /// Resolved document.
    pub const fn payload(&self) -> &Document {
        &self.payload
    }

    /// Content checksums.
    pub const fn checksums(&self) -> &PayloadChecksums {
        &self.checksums
    }

    /// Generation the payload belongs to.
    pub const fn generation(&self) -> i64 {
        self.generation
    }

    /// Returns `true` for error payloads.
    pub const fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    /// Error code of an error payload.
    pub const fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    /// Definition source lines.
    pub fn def_content(&self) -> &[String] {
        &self.def_content
    }

    /// Platform version, if known.
    pub fn platform_version(&self) -> Option<&str> {
        self.platform_version.as_deref()
    }
}

impl std::fmt::Display for RawConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{},{},{},MD5:{},XXHASH64:{},{},{}",
            self.key.namespace(),
            self.key.name(),
            self.def_md5.as_deref().unwrap_or("null"),
            self.key.config_id(),
            self.checksums.md5(),
            self.checksums.xxhash64(),
            self.generation,
            self.platform_version.as_deref().unwrap_or("null"),
        )
    }
}
