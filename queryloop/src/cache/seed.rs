// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session-stable seeds for random ordering
//!
//! Paginated requests for the same element reuse one seed while it lives,
//! so page 2 continues the sequence page 1 started instead of reshuffling.

use super::TtlStore;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct SeedStore {
    store: Arc<dyn TtlStore>,
    default_ttl: Duration,
}

impl SeedStore {
    pub fn new(store: Arc<dyn TtlStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    fn key(element_id: &str) -> String {
        format!("queryloop:seed:{}", element_id)
    }

    /// Seed for `element_id`; `ttl_minutes == Some(0)` opts out and yields `None`
    pub fn seed_for(&self, element_id: &str, ttl_minutes: Option<u64>) -> Option<u64> {
        let ttl = match ttl_minutes {
            Some(0) => return None,
            Some(minutes) => Duration::from_secs(minutes * 60),
            None => self.default_ttl,
        };
        Some(self.seed_with_ttl(element_id, ttl))
    }

    pub fn seed_with_ttl(&self, element_id: &str, ttl: Duration) -> u64 {
        let key = Self::key(element_id);
        if let Some(seed) = self.store.get(&key).and_then(|v| v.as_u64()) {
            return seed;
        }

        let seed = fastrand::u64(1..);
        self.store.set(&key, Value::from(seed), ttl);
        info!("Generated random-order seed for '{}'", element_id);
        seed
    }

    /// Drop the seed so the next request reshuffles
    pub fn invalidate(&self, element_id: &str) -> bool {
        let removed = self.store.delete(&Self::key(element_id));
        if removed {
            info!("Invalidated random-order seed for '{}'", element_id);
        }
        removed
    }
}
