// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity of a resolvable configuration.

use serde::{Deserialize, Serialize};
use stratum_schema::ConfigDefinitionKey;

/// `(name, namespace, config id)` of one configuration instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    name: String,
    namespace: String,
    config_id: String,
}

impl ConfigKey {
    /// Build a key from its parts.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            config_id: config_id.into(),
        }
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Definition namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identifier of the consuming service instance.
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Key of the definition this configuration is an instance of.
    pub fn definition_key(&self) -> ConfigDefinitionKey {
        ConfigDefinitionKey::new(self.name.as_str(), self.namespace.as_str())
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{},{}", self.namespace, self.name, self.config_id)
    }
}

/// Cache identity: a [`ConfigKey`] plus the definition checksum the caller
/// resolved against. All four parts take part in equality and hashing; an
/// absent checksum only equals another absent checksum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigCacheKey {
    key: ConfigKey,
    def_md5: Option<String>,
}

impl ConfigCacheKey {
    /// Build a cache key.
    pub const fn new(key: ConfigKey, def_md5: Option<String>) -> Self {
        Self { key, def_md5 }
    }

    /// Configuration identity.
    pub const fn key(&self) -> &ConfigKey {
        &self.key
    }

    /// Definition checksum, if the caller supplied one.
    pub fn def_md5(&self) -> Option<&str> {
        self.def_md5.as_deref()
    }
}

impl std::fmt::Display for ConfigCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.key, self.def_md5.as_deref().unwrap_or("null"))
    }
}
