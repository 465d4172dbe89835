// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache supplier doubles that count their invocations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps suppliers so tests can assert how often a cache ran them.
///
/// Clones share one counter, so a clone can be moved into each thread.
///
/// ```
/// use stratum_dry_tests::CountingSupplier;
///
/// let counter = CountingSupplier::new();
/// let supply = counter.wrap(|| 5);
/// assert_eq!(supply(), 5);
/// assert_eq!(counter.calls(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountingSupplier {
    calls: Arc<AtomicUsize>,
}

impl CountingSupplier {
    /// Fresh counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wrapped suppliers that have run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap `supplier` so running it bumps the counter.
    pub fn wrap<T, F>(&self, supplier: F) -> impl FnOnce() -> T
    where
        F: FnOnce() -> T,
    {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            supplier()
        }
    }
}
