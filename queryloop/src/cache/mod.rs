// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Caching for query loops
//!
//! - [`TtlStore`]: generic expiring key-value store, moka-backed by default
//! - [`ResultCache`]: fingerprint-keyed raw backend results (adjacent-request cache)
//! - [`SeedStore`]: per-element random-order seeds
//!
//! Both caches are shared across render passes and tolerate last-writer-wins
//! races: values are a pure function of their key.

pub mod result_cache;
pub mod seed;
pub mod store;

pub use result_cache::{ResultCache, ResultCacheKey, ResultCacheMetric, ResultCacheStats};
pub use seed::SeedStore;
pub use store::{MemoryTtlStore, TtlStore};
