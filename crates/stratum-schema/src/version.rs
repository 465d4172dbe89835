// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Definition version strings (`1-0-0`, `2.1`) and their ordering.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::SchemaError;

/// Parsed numeric version. Missing trailing components compare as zero, so
/// `1-0` == `1`.
#[derive(Debug, Clone)]
pub struct DefVersion(Vec<u64>);

impl DefVersion {
    /// Components as parsed.
    pub fn components(&self) -> &[u64] {
        &self.0
    }

    fn significant(&self) -> &[u64] {
        let end = self
            .0
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.0[..end]
    }
}

impl FromStr for DefVersion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(['-', '.'])
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SchemaError::InvalidVersion(s.to_owned()))?;
        Ok(Self(parts))
    }
}

impl Ord for DefVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DefVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DefVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for DefVersion {}

impl Hash for DefVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl std::fmt::Display for DefVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                f.write_str("-")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

/// Orders version strings component-wise, ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionComparator;

impl VersionComparator {
    /// Compare two version strings. Fails if either has a non-numeric component.
    pub fn compare(&self, a: &str, b: &str) -> Result<Ordering, SchemaError> {
        let a: DefVersion = a.parse()?;
        let b: DefVersion = b.parse()?;
        Ok(a.cmp(&b))
    }

    /// Sort version strings ascending in place.
    pub fn sort(&self, versions: &mut [String]) -> Result<(), SchemaError> {
        let mut parsed = versions
            .iter()
            .map(|v| v.parse::<DefVersion>().map(|p| (p, v.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_by(|a, b| a.0.cmp(&b.0));
        for (slot, (_, v)) in versions.iter_mut().zip(parsed) {
            *slot = v;
        }
        Ok(())
    }
}
