// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend data providers
//!
//! Three built-in domains (content items, terms, accounts) plus custom
//! providers registered under their own key. Each provider executes a
//! prepared parameter tree and resolves loop-object identity.

mod memory;

pub use memory::MemoryProvider;

use crate::error::{QueryError, Result};
use crate::pagination::{self, Paginator};
use crate::types::{LoopObject, ObjectType, QueryVars};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Raw result of one backend execution: the requested page plus the total
/// number of matching rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub items: Vec<LoopObject>,
    pub total: u64,
}

impl RawResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, object_type: &ObjectType, vars: &QueryVars) -> Result<RawResult>;

    fn paginator(&self, object_type: &ObjectType) -> &'static dyn Paginator {
        pagination::for_object_type(object_type)
    }

    fn loop_object_id(&self, object: &LoopObject) -> Option<u64> {
        object.id
    }

    fn loop_object_type(&self, object: &LoopObject) -> String {
        object.kind.clone()
    }
}

/// Providers by object type
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ObjectType, Arc<dyn DataProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object_type: ObjectType, provider: Arc<dyn DataProvider>) {
        self.providers.insert(object_type, provider);
    }

    pub fn get(&self, object_type: &ObjectType) -> Result<Arc<dyn DataProvider>> {
        self.providers
            .get(object_type)
            .cloned()
            .ok_or_else(|| QueryError::ProviderMissing(object_type.clone()))
    }

    pub fn contains(&self, object_type: &ObjectType) -> bool {
        self.providers.contains_key(object_type)
    }

    pub fn object_types(&self) -> Vec<ObjectType> {
        self.providers.keys().cloned().collect()
    }
}
