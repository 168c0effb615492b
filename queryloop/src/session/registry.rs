// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Context registry: the ordered stack of looping query instances

use crate::types::InstanceId;

/// Insertion order is nesting order; the last entry is the innermost loop.
#[derive(Debug, Default, Clone)]
pub struct ContextRegistry {
    stack: Vec<InstanceId>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: InstanceId) {
        self.stack.push(id);
    }

    /// Remove `id` wherever it sits. Returns false if it was not registered.
    pub fn remove(&mut self, id: InstanceId) -> bool {
        match self.stack.iter().rposition(|entry| *entry == id) {
            Some(position) => {
                self.stack.remove(position);
                true
            }
            None => false,
        }
    }

    /// Innermost looping instance
    pub fn top(&self) -> Option<InstanceId> {
        self.stack.last().copied()
    }

    /// Level 0 is the innermost loop, 1 its parent, and so on
    pub fn at_level(&self, level: usize) -> Option<InstanceId> {
        self.stack.iter().rev().nth(level).copied()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.stack.contains(&id)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
