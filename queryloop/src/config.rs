// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Site-wide settings consulted during preparation and caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when a specification leaves it unset
    pub default_per_page: i64,
    /// Master switch for the result cache
    pub cache_enabled: bool,
    /// Result cache lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Random seed lifetime in minutes
    pub seed_ttl_minutes: u64,
    /// Maximum entries held by the in-memory TTL store
    pub cache_capacity: u64,
    /// Attachment-like item type
    pub attachment_type: String,
    /// Mime-type restriction applied to attachment-only queries
    pub attachment_mime_types: Vec<String>,
    /// Item type used when a content query names none
    pub default_item_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            cache_enabled: true,
            cache_ttl_secs: 60,   // adjacent-request cache
            seed_ttl_minutes: 60,
            cache_capacity: 10_000,
            attachment_type: "attachment".to_string(),
            attachment_mime_types: vec!["image".to_string()],
            default_item_type: "post".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON document; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn seed_ttl(&self) -> Duration {
        Duration::from_secs(self.seed_ttl_minutes * 60)
    }

    /// Create a configuration with caching switched off
    pub fn without_cache() -> Self {
        Self {
            cache_enabled: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"default_per_page": 24}"#).unwrap();
        assert_eq!(config.default_per_page, 24);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.seed_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
    }
}
