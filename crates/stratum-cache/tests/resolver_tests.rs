// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::sync::Arc;
use std::thread;

use serde_json::json;
use stratum_cache::{
    definition_md5, ConfigCacheKey, ConfigKey, ConfigResolver, DefinitionRegistry, Fragments,
    ResolveError, ResolverOptions,
};
use stratum_dry_tests::{nested_document, NestedConfig, NESTED_DEF, SIMPLE_DEF};

fn resolver(options: ResolverOptions) -> ConfigResolver {
    let registry = DefinitionRegistry::new();
    registry.register_source("nested", NESTED_DEF).unwrap();
    registry.register_source("simple", SIMPLE_DEF).unwrap();
    ConfigResolver::new(registry, options)
}

fn nested_key() -> ConfigKey {
    ConfigKey::new("nested", "test", "search/0")
}

#[test]
fn end_to_end_simple_resolution() {
    let r = resolver(ResolverOptions::default());
    let key = ConfigKey::new("simple", "test", "svc");
    r.deploy(1, None, Fragments::from([(key.clone(), vec![json!({"stringval": "abcde"})])]))
        .unwrap();
    let raw = r.resolve(&key, None).unwrap();
    assert_eq!(raw.payload(), &json!({"stringval": "abcde", "intval": 0}));
    assert_eq!(r.render(&key, None).unwrap(), "stringval \"abcde\"\nintval 0\n");
}

#[test]
fn typed_instance_through_the_resolver() {
    let r = resolver(ResolverOptions::default());
    r.deploy(3, None, Fragments::from([(nested_key(), vec![nested_document()])]))
        .unwrap();
    let config: NestedConfig = r.instance("search/0").unwrap();
    assert_eq!(config.intval, 42);
    assert_eq!(config.nestedarr.len(), 2);
}

#[test]
fn binding_failure_is_downgraded_or_reported() {
    let broken = Fragments::from([(nested_key(), vec![json!({"nestedarr": [{"bar": 1}]})])]);

    let lenient = resolver(ResolverOptions::default());
    lenient.deploy(1, None, broken.clone()).unwrap();
    let config: NestedConfig = lenient.instance("search/0").unwrap();
    assert!(config.nestedarr.is_empty());
    assert_eq!(config.stringval, "foo");

    let strict = resolver(ResolverOptions {
        bind_fallback: false,
        ..ResolverOptions::default()
    });
    strict.deploy(1, None, broken).unwrap();
    assert!(matches!(
        strict.instance::<NestedConfig>("search/0"),
        Err(ResolveError::Bind(_))
    ));
}

#[test]
fn defaults_can_be_switched_off() {
    let r = resolver(ResolverOptions {
        apply_defaults: false,
        ..ResolverOptions::default()
    });
    let key = ConfigKey::new("simple", "test", "svc");
    assert_eq!(r.resolve(&key, None).unwrap().payload(), &json!({}));
}

#[test]
fn strict_encoding_accepts_validated_payloads() {
    let r = resolver(ResolverOptions {
        strict_encoding: true,
        ..ResolverOptions::default()
    });
    r.deploy(1, None, Fragments::from([(nested_key(), vec![json!({"intval": 7})])]))
        .unwrap();
    assert!(r.render(&nested_key(), None).is_ok());
}

#[test]
fn checksum_mismatch_still_resolves_under_its_own_cache_key() {
    let r = resolver(ResolverOptions::default());
    let md5 = definition_md5(NESTED_DEF.lines());
    let matching = r.resolve(&nested_key(), Some(md5.as_str())).unwrap();
    let stale = r.resolve(&nested_key(), Some("0000")).unwrap();
    assert_eq!(matching.def_md5(), Some(md5.as_str()));
    assert_eq!(stale.def_md5(), Some("0000"));
    assert_eq!(
        stale.cache_key(),
        ConfigCacheKey::new(nested_key(), Some("0000".to_owned()))
    );
    assert_eq!(matching.payload(), stale.payload());
    assert!(!Arc::ptr_eq(&matching, &stale));
    let unspecified = r.resolve(&nested_key(), None).unwrap();
    assert!(Arc::ptr_eq(&matching, &unspecified));
    assert_eq!(unspecified.cache_key(), matching.cache_key());
    assert_eq!(r.cache_stats().misses, 2);
}

#[test]
fn concurrent_resolution_builds_once() {
    let r = Arc::new(resolver(ResolverOptions::default()));
    r.deploy(1, None, Fragments::from([(nested_key(), vec![nested_document()])]))
        .unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = Arc::clone(&r);
            thread::spawn(move || r.resolve(&nested_key(), None).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    let stats = r.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
}
