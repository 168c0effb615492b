// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! TTL key-value store

use moka::sync::Cache;
use moka::Expiry;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Expiring key-value store shared by the result cache and the seed store
pub trait TtlStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
    /// Returns whether a live entry was removed
    fn delete(&self, key: &str) -> bool;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    ttl: Duration,
}

/// Each entry expires after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process store
pub struct MemoryTtlStore {
    entries: Cache<String, StoredValue>,
}

impl MemoryTtlStore {
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryTtlStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TtlStore for MemoryTtlStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(key.to_string(), StoredValue { value, ttl });
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}
