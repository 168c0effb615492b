// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Raw backend result caching keyed by query fingerprint

use super::TtlStore;
use crate::backend::RawResult;
use crate::error::Result;
use crate::types::QueryVars;
use crossbeam_utils::CachePadded;
use log::{debug, warn};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fingerprint of one query execution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultCacheKey {
    pub element_id: String,
    /// Hash of the serialized, fully resolved parameter tree
    pub vars_hash: u64,
    /// Current item of the nearest looping ancestor, 0 at the root
    pub ancestor_id: u64,
}

impl ResultCacheKey {
    pub fn new(element_id: &str, vars: &QueryVars, ancestor_id: u64) -> Result<Self> {
        let serialized = serde_json::to_string(vars)?;
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);

        Ok(Self {
            element_id: element_id.to_string(),
            vars_hash: hasher.finish(),
            ancestor_id,
        })
    }

    pub fn cache_key(&self) -> String {
        format!(
            "queryloop:result:{}:{:016x}:{}",
            self.element_id, self.vars_hash, self.ancestor_id
        )
    }
}

#[repr(usize)]
#[derive(Copy, Clone, Debug)]
pub enum ResultCacheMetric {
    Hits = 0,
    Misses = 1,
    Stores = 2,
    Invalidations = 3,
    DecodeFailures = 4,
}

const RESULT_CACHE_METRIC_COUNT: usize = ResultCacheMetric::DecodeFailures as usize + 1;

#[derive(Debug)]
pub struct ResultCacheStats {
    metrics: [CachePadded<AtomicU64>; RESULT_CACHE_METRIC_COUNT],
}

impl ResultCacheStats {
    #[inline]
    pub fn inc(&self, metric: ResultCacheMetric) {
        self.metrics[metric as usize].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self, metric: ResultCacheMetric) -> u64 {
        self.metrics[metric as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.load(ResultCacheMetric::Hits);
        let misses = self.load(ResultCacheMetric::Misses);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl Clone for ResultCacheStats {
    fn clone(&self) -> Self {
        let cloned = ResultCacheStats::default();
        for (index, metric) in self.metrics.iter().enumerate() {
            cloned.metrics[index].store(metric.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        cloned
    }
}

impl Default for ResultCacheStats {
    fn default() -> Self {
        Self {
            metrics: std::array::from_fn(|_| CachePadded::new(AtomicU64::new(0))),
        }
    }
}

/// Short-lived cache of raw backend results
pub struct ResultCache {
    store: Arc<dyn TtlStore>,
    ttl: Duration,
    stats: ResultCacheStats,
}

impl ResultCache {
    pub fn new(store: Arc<dyn TtlStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            stats: ResultCacheStats::default(),
        }
    }

    pub fn get(&self, key: &ResultCacheKey) -> Option<RawResult> {
        let Some(stored) = self.store.get(&key.cache_key()) else {
            self.stats.inc(ResultCacheMetric::Misses);
            return None;
        };

        match serde_json::from_value(stored) {
            Ok(result) => {
                self.stats.inc(ResultCacheMetric::Hits);
                debug!("Result cache hit for '{}'", key.element_id);
                Some(result)
            }
            Err(err) => {
                warn!("Discarding undecodable cache entry for '{}': {}", key.element_id, err);
                self.stats.inc(ResultCacheMetric::DecodeFailures);
                self.stats.inc(ResultCacheMetric::Misses);
                self.store.delete(&key.cache_key());
                None
            }
        }
    }

    pub fn insert(&self, key: &ResultCacheKey, result: &RawResult) {
        match serde_json::to_value(result) {
            Ok(value) => {
                self.store.set(&key.cache_key(), value, self.ttl);
                self.stats.inc(ResultCacheMetric::Stores);
            }
            Err(err) => warn!("Could not cache result for '{}': {}", key.element_id, err),
        }
    }

    pub fn invalidate(&self, key: &ResultCacheKey) -> bool {
        self.stats.inc(ResultCacheMetric::Invalidations);
        self.store.delete(&key.cache_key())
    }

    pub fn stats(&self) -> ResultCacheStats {
        self.stats.clone()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
