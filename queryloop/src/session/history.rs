// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! History table: resolved query instances reused within one render pass

use crate::query::QueryInstance;
use std::collections::HashMap;

/// Element identity qualified by the nearest looping ancestor and its current item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    /// `(ancestor element id, ancestor current-item id)`; `None` at the root
    pub ancestor: Option<(String, u64)>,
    pub element_id: String,
}

impl HistoryKey {
    pub fn root(element_id: impl Into<String>) -> Self {
        Self {
            ancestor: None,
            element_id: element_id.into(),
        }
    }

    pub fn nested(ancestor_element: impl Into<String>, ancestor_item: u64, element_id: impl Into<String>) -> Self {
        Self {
            ancestor: Some((ancestor_element.into(), ancestor_item)),
            element_id: element_id.into(),
        }
    }
}

/// Snapshots taken right after execution, before any looping
#[derive(Debug, Default)]
pub struct HistoryTable {
    entries: HashMap<HistoryKey, QueryInstance>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &HistoryKey) -> Option<&QueryInstance> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: HistoryKey, snapshot: QueryInstance) {
        self.entries.insert(key, snapshot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_distinguish_ancestor_items() {
        let root = HistoryKey::root("inner");
        let under_one = HistoryKey::nested("outer", 1, "inner");
        let under_two = HistoryKey::nested("outer", 2, "inner");

        assert_ne!(root, under_one);
        assert_ne!(under_one, under_two);
        assert_eq!(under_one, HistoryKey::nested("outer", 1, "inner"));
    }
}
