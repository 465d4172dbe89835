// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;
use serde_json::json;
use stratum_cache::{ConfigCache, ConfigCacheKey, ConfigKey, RawConfig};
use stratum_dry_tests::CountingSupplier;

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn hit_does_not_invoke_supplier() {
    let cache: ConfigCache<ConfigCacheKey, RawConfig> = ConfigCache::new();
    let key = ConfigCacheKey::new(ConfigKey::new("foo", "bar", "id"), None);
    let counter = CountingSupplier::new();
    let make = || RawConfig::new(key.key().clone(), None, json!({"a": 1}), 1);
    let first = cache.compute_if_absent(&key, counter.wrap(make));
    let second = cache.compute_if_absent(&key, counter.wrap(make));
    assert_eq!(counter.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn distinct_keys_compute_independently() {
    let cache: Arc<ConfigCache<ConfigCacheKey, u64>> = Arc::new(ConfigCache::new());
    let counter = CountingSupplier::new();
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16u64)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let counter = counter.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let key = ConfigCacheKey::new(ConfigKey::new("n", "ns", format!("id{}", i % 4)), None);
                barrier.wait();
                *cache.compute_if_absent(&key, counter.wrap(move || i % 4))
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.calls(), 4);
    assert_eq!(cache.len(), 4);
}

proptest! {
    #[test]
    fn cache_key_equality_is_componentwise(
        a in ("[a-c]", "[a-c]", "[a-c]", prop::option::of("[x-z]")),
        b in ("[a-c]", "[a-c]", "[a-c]", prop::option::of("[x-z]")),
    ) {
        let ka = ConfigCacheKey::new(ConfigKey::new(a.0.clone(), a.1.clone(), a.2.clone()), a.3.clone());
        let kb = ConfigCacheKey::new(ConfigKey::new(b.0.clone(), b.1.clone(), b.2.clone()), b.3.clone());
        prop_assert_eq!(ka == kb, a == b);
        if ka == kb {
            prop_assert_eq!(hash_of(&ka), hash_of(&kb));
        }
    }
}
