//! Key-based selection sets.
//!
//! Selection stores keys only, never records. Records are derived from the
//! live rows on demand, and keys of rows that disappear are pruned by the
//! owning engine.

use std::collections::HashSet;

use crate::key::RowKey;

/// Insertion-ordered set of selected keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected keys, in selection order
    order: Vec<RowKey>,
    /// Membership index over `order`
    index: HashSet<RowKey>,
}

impl Selection {
    /// Create a new empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection from keys, dropping duplicates.
    pub fn from_keys(keys: impl IntoIterator<Item = RowKey>) -> Self {
        let mut selection = Self::new();
        for key in keys {
            selection.insert(key);
        }
        selection
    }

    /// Selected keys in selection order.
    pub fn keys(&self) -> &[RowKey] {
        &self.order
    }

    /// Check if a key is selected.
    pub fn contains(&self, key: &RowKey) -> bool {
        self.index.contains(key)
    }

    /// Get the number of selected keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Select a key. Returns `true` if it was not selected before.
    pub fn insert(&mut self, key: RowKey) -> bool {
        if self.index.insert(key.clone()) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    /// Deselect a key. Returns `true` if it was selected.
    pub fn remove(&mut self, key: &RowKey) -> bool {
        if self.index.remove(key) {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Clear all selection.
    /// Returns the keys that were deselected.
    pub fn clear(&mut self) -> Vec<RowKey> {
        self.index.clear();
        std::mem::take(&mut self.order)
    }

    /// Keep only the keys for which `f` returns `true`.
    /// Returns the keys that were dropped.
    pub fn retain(&mut self, mut f: impl FnMut(&RowKey) -> bool) -> Vec<RowKey> {
        let (kept, dropped): (Vec<RowKey>, Vec<RowKey>) =
            std::mem::take(&mut self.order).into_iter().partition(|k| f(k));
        for key in &dropped {
            self.index.remove(key);
        }
        self.order = kept;
        dropped
    }

    /// Replace the selection.
    /// Returns (added, removed) keys.
    pub fn replace(&mut self, keys: impl IntoIterator<Item = RowKey>) -> (Vec<RowKey>, Vec<RowKey>) {
        let next = Self::from_keys(keys);
        let removed: Vec<_> = self
            .order
            .iter()
            .filter(|k| !next.contains(k))
            .cloned()
            .collect();
        let added: Vec<_> = next
            .order
            .iter()
            .filter(|k| !self.contains(k))
            .cloned()
            .collect();
        *self = next;
        (added, removed)
    }
}
