// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generation-scoped configuration resolution for one application.
//!
//! A [`ConfigResolver`] holds the definitions it knows, the configuration
//! fragments of the current deployment, and a [`ConfigCache`] of resolved
//! payloads for that deployment. Resolving a key merges its fragments in
//! order, materializes the result, applies schema defaults and wraps it in a
//! [`RawConfig`]. A redeploy installs a new deployment with a fresh cache;
//! payloads from the previous generation stay valid for anyone still holding
//! them but are never served again.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stratum_payload::{
    apply_defaults, bind, bind_or_default, BindError, ConfigInstance, Document, EncodeError,
    EncoderOptions, PayloadBuilder, PayloadError, TextEncoder,
};
use stratum_schema::{parse_definition, ConfigDefinition, ConfigDefinitionKey, SchemaError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ConfigCache};
use crate::checksum::definition_md5;
use crate::key::{ConfigCacheKey, ConfigKey};
use crate::raw_config::RawConfig;

/// Resolver behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Backfill schema defaults into resolved payloads.
    pub apply_defaults: bool,
    /// Type-check non-string leaves when rendering text.
    pub strict_encoding: bool,
    /// Serve defaults instead of failing when typed binding fails.
    pub bind_fallback: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            apply_defaults: true,
            strict_encoding: false,
            bind_fallback: true,
        }
    }
}

impl ResolverOptions {
    /// Parse options from JSON; missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encoder options implied by these resolver options.
    pub const fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            strict_types: self.strict_encoding,
        }
    }
}

/// Failure to resolve a configuration.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No definition registered for the requested key.
    #[error("unknown config definition {0}")]
    UnknownDefinition(ConfigDefinitionKey),
    /// A deployment must move the generation forward.
    #[error("generation {requested} is not newer than current generation {current}")]
    StaleGeneration {
        /// Generation currently deployed.
        current: i64,
        /// Generation that was offered.
        requested: i64,
    },
    /// Definition source failed to parse.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A fragment does not fit its definition.
    #[error(transparent)]
    Payload(#[from] PayloadError),
    /// Text rendering failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Typed binding failed and fallback is disabled.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// Options text is not valid JSON for [`ResolverOptions`].
    #[error("invalid resolver options: {0}")]
    Options(#[from] serde_json::Error),
}

impl ResolveError {
    /// Numeric code carried by error payloads built from this error.
    pub const fn code(&self) -> i32 {
        match self {
            Self::UnknownDefinition(_) => 1,
            Self::StaleGeneration { .. } => 2,
            Self::Schema(_) => 3,
            Self::Payload(_) => 4,
            Self::Encode(_) => 5,
            Self::Bind(_) => 6,
            Self::Options(_) => 7,
        }
    }
}

/// A parsed definition together with its checksum and source lines.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredDefinition {
    schema: ConfigDefinition,
    md5: String,
    content: Vec<String>,
}

impl RegisteredDefinition {
    /// Parsed schema.
    pub const fn schema(&self) -> &ConfigDefinition {
        &self.schema
    }

    /// Checksum of the normalized source.
    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Source lines as registered.
    pub fn content(&self) -> &[String] {
        &self.content
    }
}

/// Definitions known to a resolver, keyed by `(name, namespace)`.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: DashMap<ConfigDefinitionKey, Arc<RegisteredDefinition>>,
}

impl DefinitionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` as definition `name` and register it, replacing any
    /// definition with the same key.
    pub fn register_source(
        &self,
        name: &str,
        source: &str,
    ) -> Result<Arc<RegisteredDefinition>, SchemaError> {
        let schema = parse_definition(name, source)?;
        let content: Vec<String> = source.lines().map(str::to_owned).collect();
        let md5 = definition_md5(&content);
        let entry = Arc::new(RegisteredDefinition {
            schema,
            md5,
            content,
        });
        let key = entry.schema.key();
        debug!(definition = %key, md5 = %entry.md5, "registered definition");
        self.definitions.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Definition registered under `key`.
    pub fn get(&self, key: &ConfigDefinitionKey) -> Option<Arc<RegisteredDefinition>> {
        self.definitions.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<ConfigDefinitionKey> {
        let mut keys: Vec<_> = self.definitions.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Configuration fragments of one deployment, applied in order.
pub type Fragments = BTreeMap<ConfigKey, Vec<Document>>;

#[derive(Debug, Default)]
struct Deployment {
    generation: i64,
    platform_version: Option<String>,
    fragments: Fragments,
    cache: ConfigCache<ConfigCacheKey, RawConfig>,
}

/// Resolves, caches and renders configurations for one application.
#[derive(Debug)]
pub struct ConfigResolver {
    registry: DefinitionRegistry,
    options: ResolverOptions,
    deployment: RwLock<Arc<Deployment>>,
}

impl ConfigResolver {
    /// Resolver with no deployment (generation 0, no fragments).
    pub fn new(registry: DefinitionRegistry, options: ResolverOptions) -> Self {
        Self {
            registry,
            options,
            deployment: RwLock::new(Arc::new(Deployment::default())),
        }
    }

    /// Definitions this resolver knows.
    pub const fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Options in effect.
    pub const fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Generation currently deployed.
    pub fn generation(&self) -> i64 {
        self.deployment.read().generation
    }

    /// Counters of the current generation's cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.deployment.read().cache.stats()
    }

    fn current(&self) -> Arc<Deployment> {
        Arc::clone(&self.deployment.read())
    }

    /// Install a new deployment. `generation` must be newer than the current
    /// one. The previous generation's cache is dropped.
    pub fn deploy(
        &self,
        generation: i64,
        platform_version: Option<String>,
        fragments: Fragments,
    ) -> Result<(), ResolveError> {
        let mut slot = self.deployment.write();
        if generation <= slot.generation {
            return Err(ResolveError::StaleGeneration {
                current: slot.generation,
                requested: generation,
            });
        }
        info!(
            from = slot.generation,
            to = generation,
            configs = fragments.len(),
            "deploying new generation"
        );
        *slot = Arc::new(Deployment {
            generation,
            platform_version,
            fragments,
            cache: ConfigCache::new(),
        });
        Ok(())
    }

    /// Forget the application: fragments and cached payloads are evicted.
    /// The generation counter is kept so a later deploy must still move
    /// forward.
    pub fn remove_application(&self) {
        let mut slot = self.deployment.write();
        info!(generation = slot.generation, "removing application");
        *slot = Arc::new(Deployment {
            generation: slot.generation,
            ..Deployment::default()
        });
    }

    /// Resolve `key` for the current generation. `def_md5` is the checksum
    /// of the definition the caller holds; `None` stands for the registered
    /// definition's checksum. That checksum is both the cache key's and the
    /// one stored in the payload, so [`RawConfig::cache_key`] names the slot
    /// the payload lives in. A mismatch with the registered definition is
    /// logged and the payload is still built from the registered schema.
    pub fn resolve(
        &self,
        key: &ConfigKey,
        def_md5: Option<&str>,
    ) -> Result<Arc<RawConfig>, ResolveError> {
        let definition_key = key.definition_key();
        let registered = self
            .registry
            .get(&definition_key)
            .ok_or(ResolveError::UnknownDefinition(definition_key))?;
        if let Some(requested) = def_md5.filter(|md5| *md5 != registered.md5) {
            warn!(
                %key,
                requested,
                registered = %registered.md5,
                "definition checksum mismatch; resolving with registered definition"
            );
        }
        let md5 = def_md5.unwrap_or(registered.md5.as_str());
        let deployment = self.current();
        let cache_key = ConfigCacheKey::new(key.clone(), Some(md5.to_owned()));
        deployment
            .cache
            .try_compute_if_absent(&cache_key, || {
                self.build(&deployment, key, &registered, md5)
            })
    }

    /// Like [`Self::resolve`], but failures become error payloads.
    pub fn resolve_or_error(&self, key: &ConfigKey, def_md5: Option<&str>) -> Arc<RawConfig> {
        self.resolve(key, def_md5).unwrap_or_else(|err| {
            warn!(%key, ?err, "resolution failed; serving error payload");
            Arc::new(RawConfig::error(
                key.clone(),
                def_md5.map(str::to_owned),
                self.generation(),
                err.code(),
            ))
        })
    }

    /// Resolve `key` and render it in the text wire format.
    pub fn render(&self, key: &ConfigKey, def_md5: Option<&str>) -> Result<String, ResolveError> {
        let raw = self.resolve(key, def_md5)?;
        let registered = self
            .registry
            .get(&key.definition_key())
            .ok_or_else(|| ResolveError::UnknownDefinition(key.definition_key()))?;
        let encoder = TextEncoder::with_options(&registered.schema, self.options.encoder_options());
        Ok(encoder.encode_to_string(raw.payload())?)
    }

    /// Resolve and bind the configuration of `T` for `config_id`. With
    /// `bind_fallback` on, a binding failure is logged and the defaults-only
    /// instance is returned instead.
    pub fn instance<T>(&self, config_id: &str) -> Result<T, ResolveError>
    where
        T: ConfigInstance + Default,
    {
        let key = ConfigKey::new(T::NAME, T::NAMESPACE, config_id);
        let raw = self.resolve(&key, None)?;
        let registered = self
            .registry
            .get(&key.definition_key())
            .ok_or_else(|| ResolveError::UnknownDefinition(key.definition_key()))?;
        if self.options.bind_fallback {
            Ok(bind_or_default(raw.payload(), &registered.schema))
        } else {
            Ok(bind(raw.payload(), &registered.schema)?)
        }
    }

    fn build(
        &self,
        deployment: &Deployment,
        key: &ConfigKey,
        registered: &RegisteredDefinition,
        md5: &str,
    ) -> Result<RawConfig, ResolveError> {
        let schema = &registered.schema;
        let mut merged = PayloadBuilder::bound(schema);
        for fragment in deployment.fragments.get(key).into_iter().flatten() {
            let layer = PayloadBuilder::from_document_with_schema(fragment, schema)?;
            merged.merge_override(&layer);
        }
        let mut payload = merged.resolve();
        if self.options.apply_defaults {
            apply_defaults(&mut payload, schema);
        }
        debug!(%key, generation = deployment.generation, "resolved config");
        Ok(
            RawConfig::new(key.clone(), Some(md5.to_owned()), payload, deployment.generation)
                .with_def_content(registered.content.clone())
                .with_platform_version(deployment.platform_version.clone()),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEF: &str = "namespace=test\nname string default=\"n\"\ncount int default=1\nitems[] string\n";

    fn resolver() -> ConfigResolver {
        let registry = DefinitionRegistry::new();
        registry.register_source("simple", DEF).unwrap();
        ConfigResolver::new(registry, ResolverOptions::default())
    }

    fn key() -> ConfigKey {
        ConfigKey::new("simple", "test", "svc/0")
    }

    #[test]
    fn options_parse_with_defaults() {
        let opts = ResolverOptions::from_json(r#"{"strict_encoding": true}"#).unwrap();
        assert!(opts.apply_defaults);
        assert!(opts.strict_encoding);
        assert!(opts.bind_fallback);
        assert!(ResolverOptions::from_json("[").is_err());
    }

    #[test]
    fn merges_fragments_in_order_and_applies_defaults() {
        let r = resolver();
        let fragments = Fragments::from([(
            key(),
            vec![
                json!({"count": 2, "items": ["a"]}),
                json!({"count": 3, "items": ["b"]}),
            ],
        )]);
        r.deploy(1, Some("1.2.3".into()), fragments).unwrap();
        let raw = r.resolve(&key(), None).unwrap();
        assert_eq!(
            raw.payload(),
            &json!({"name": "n", "count": "3", "items": ["a", "b"]})
        );
        assert_eq!(raw.generation(), 1);
        assert_eq!(raw.platform_version(), Some("1.2.3"));
        assert_eq!(raw.def_md5(), Some(definition_md5(DEF.lines()).as_str()));
    }

    #[test]
    fn second_resolve_hits_the_cache() {
        let r = resolver();
        let first = r.resolve(&key(), None).unwrap();
        let second = r.resolve(&key(), None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(r.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn redeploy_supersedes_and_stale_generations_fail() {
        let r = resolver();
        r.deploy(5, None, Fragments::new()).unwrap();
        let old = r.resolve(&key(), None).unwrap();
        r.deploy(6, None, Fragments::new()).unwrap();
        let new = r.resolve(&key(), None).unwrap();
        assert_eq!(old.generation(), 5);
        assert_eq!(new.generation(), 6);
        assert_ne!(old, new);
        assert!(matches!(
            r.deploy(6, None, Fragments::new()),
            Err(ResolveError::StaleGeneration { current: 6, requested: 6 })
        ));
    }

    #[test]
    fn remove_application_evicts_payloads() {
        let r = resolver();
        r.deploy(1, None, Fragments::from([(key(), vec![json!({"count": 9})])]))
            .unwrap();
        assert_eq!(r.resolve(&key(), None).unwrap().payload()["count"], json!("9"));
        r.remove_application();
        assert_eq!(r.generation(), 1);
        assert_eq!(r.cache_stats(), CacheStats::default());
        assert_eq!(r.resolve(&key(), None).unwrap().payload()["count"], json!(1));
    }

    #[test]
    fn unknown_definitions_become_error_payloads() {
        let r = resolver();
        let missing = ConfigKey::new("nope", "test", "svc/0");
        assert!(matches!(
            r.resolve(&missing, None),
            Err(ResolveError::UnknownDefinition(_))
        ));
        let raw = r.resolve_or_error(&missing, None);
        assert!(raw.is_error());
        assert_eq!(raw.error_code(), Some(1));
    }

    #[test]
    fn invalid_fragments_fail_resolution() {
        let r = resolver();
        r.deploy(1, None, Fragments::from([(key(), vec![json!({"count": "x"})])]))
            .unwrap();
        assert!(matches!(
            r.resolve(&key(), None),
            Err(ResolveError::Payload(_))
        ));
        assert_eq!(r.resolve_or_error(&key(), None).error_code(), Some(4));
    }

    #[test]
    fn render_produces_text_lines() {
        let r = resolver();
        r.deploy(1, None, Fragments::from([(key(), vec![json!({"items": ["x"]})])]))
            .unwrap();
        assert_eq!(
            r.render(&key(), None).unwrap(),
            "name \"n\"\ncount 1\nitems[0] \"x\"\n"
        );
    }
}
