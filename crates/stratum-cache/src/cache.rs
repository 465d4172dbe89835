// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concurrent compute-if-absent cache with per-key single flight.
//!
//! Each key owns a slot guarded by its own mutex. The first caller for a
//! missing key computes the value while holding that slot; concurrent callers
//! for the same key wait on the slot and then observe the stored value.
//! Different keys never wait on each other. A failed computation leaves the
//! slot empty, so the next caller simply computes again.
//!
//! A supplier must not resolve its own key again; that would wait on the
//! slot it already holds.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a populated slot.
    pub hits: u64,
    /// Lookups that ran a supplier.
    pub misses: u64,
}

/// Shared map from key to lazily computed, immutable value.
#[derive(Debug)]
pub struct ConfigCache<K, V>
where
    K: Eq + Hash,
{
    slots: DashMap<K, Slot<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Default for ConfigCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<K, V> ConfigCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Slot<V> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(key.clone()).or_default().value())
    }

    /// Stored value for `key`, without computing.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = Arc::clone(self.slots.get(key)?.value());
        let stored = slot.lock().clone();
        stored
    }

    /// Stored value for `key`, computing it with `supplier` on a miss.
    pub fn compute_if_absent<F>(&self, key: &K, supplier: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        match self.try_compute_if_absent(key, || Ok::<_, std::convert::Infallible>(supplier())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible [`Self::compute_if_absent`]. An error is returned to this
    /// caller only and nothing is stored.
    pub fn try_compute_if_absent<F, E>(&self, key: &K, supplier: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let mut stored = slot.lock();
        if let Some(value) = stored.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "config cache hit");
            return Ok(Arc::clone(value));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(?key, "config cache miss");
        let value = Arc::new(supplier()?);
        *stored = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.slots
            .insert(key, Arc::new(Mutex::new(Some(Arc::clone(&value)))));
        value
    }

    /// Drop the slot for `key`. Returns `true` if one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Keep only slots whose key satisfies `keep`.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.slots.retain(|key, _| keep(key));
    }

    /// Drop every slot.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of slots (populated or in flight).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no slot exists.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of the hit and miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
