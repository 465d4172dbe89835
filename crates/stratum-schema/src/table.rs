// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Name-keyed table that iterates in insertion order.

use std::collections::BTreeMap;

/// Name-keyed table with O(log n) lookup and insertion-order iteration.
///
/// Replacing an existing name keeps its original position, so iteration order
/// is the order in which names were first inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable<T> {
    entries: Vec<(String, T)>,
    index: BTreeMap<String, usize>,
}

impl<T> FieldTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Look up an entry by name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Insert or replace. Returns the previous value if `name` was present.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        if let Some(&i) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        None
    }

    /// Return the entry for `name`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(name.to_owned(), i);
                self.entries.push((name.to_owned(), make()));
                i
            }
        };
        &mut self.entries[i].1
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable entries in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for FieldTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_insertion_order() {
        let mut t = FieldTable::new();
        t.insert("zeta", 1);
        t.insert("alpha", 2);
        t.insert("mid", 3);
        let names: Vec<_> = t.names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut t = FieldTable::new();
        t.insert("a", 1);
        t.insert("b", 2);
        assert_eq!(t.insert("a", 10), Some(1));
        let pairs: Vec<_> = t.iter().map(|(k, v)| (k.to_owned(), *v)).collect();
        assert_eq!(pairs, vec![("a".to_owned(), 10), ("b".to_owned(), 2)]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn get_or_insert_with_only_builds_once() {
        let mut t: FieldTable<Vec<u8>> = FieldTable::new();
        t.get_or_insert_with("k", Vec::new).push(1);
        t.get_or_insert_with("k", || vec![9, 9]).push(2);
        assert_eq!(t.get("k").unwrap(), &vec![1, 2]);
    }
}
