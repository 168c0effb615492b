// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query engine
//!
//! Long-lived owner of everything shared across render passes: config,
//! providers, hooks, the result cache and the random-seed store. Each
//! render pass borrows it through a [`RenderSession`].

use crate::backend::{DataProvider, ProviderRegistry};
use crate::cache::{MemoryTtlStore, ResultCache, SeedStore, TtlStore};
use crate::config::EngineConfig;
use crate::hooks::{CapabilityCheck, DenyScripts, DynamicData, Hooks, NoDynamicData};
use crate::session::{AmbientContext, RenderSession};
use crate::types::ObjectType;
use crate::vars::{JsonScriptEvaluator, ScriptEvaluator};
use log::info;
use std::sync::Arc;

pub struct QueryEngine {
    config: EngineConfig,
    providers: ProviderRegistry,
    hooks: Hooks,
    result_cache: ResultCache,
    seeds: SeedStore,
    capability: Box<dyn CapabilityCheck>,
    evaluator: Box<dyn ScriptEvaluator>,
    dynamic: Box<dyn DynamicData>,
}

impl QueryEngine {
    pub fn builder(config: EngineConfig) -> QueryEngineBuilder {
        QueryEngineBuilder::new(config)
    }

    /// Start a render pass
    pub fn session(&self, ambient: AmbientContext) -> RenderSession<'_> {
        RenderSession::new(self, ambient)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn result_cache(&self) -> &ResultCache {
        &self.result_cache
    }

    pub fn seeds(&self) -> &SeedStore {
        &self.seeds
    }

    pub fn capability(&self) -> &dyn CapabilityCheck {
        self.capability.as_ref()
    }

    pub fn evaluator(&self) -> &dyn ScriptEvaluator {
        self.evaluator.as_ref()
    }

    pub fn dynamic(&self) -> &dyn DynamicData {
        self.dynamic.as_ref()
    }
}

pub struct QueryEngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn TtlStore>>,
    providers: ProviderRegistry,
    hooks: Hooks,
    capability: Box<dyn CapabilityCheck>,
    evaluator: Box<dyn ScriptEvaluator>,
    dynamic: Box<dyn DynamicData>,
}

impl QueryEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            providers: ProviderRegistry::new(),
            hooks: Hooks::new(),
            capability: Box::new(DenyScripts),
            evaluator: Box::new(JsonScriptEvaluator),
            dynamic: Box::new(NoDynamicData),
        }
    }

    /// Shared TTL store for cached results and seeds; in-memory by default
    pub fn with_store(mut self, store: Arc<dyn TtlStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_provider(mut self, object_type: ObjectType, provider: Arc<dyn DataProvider>) -> Self {
        self.providers.register(object_type, provider);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_capability(mut self, capability: impl CapabilityCheck + 'static) -> Self {
        self.capability = Box::new(capability);
        self
    }

    pub fn with_script_evaluator(mut self, evaluator: impl ScriptEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_dynamic_data(mut self, dynamic: impl DynamicData + 'static) -> Self {
        self.dynamic = Box::new(dynamic);
        self
    }

    pub fn build(self) -> QueryEngine {
        let config = self.config;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTtlStore::new(config.cache_capacity)) as Arc<dyn TtlStore>);

        info!(
            "Query engine ready: {} providers, result cache {} (ttl {}s)",
            self.providers.object_types().len(),
            if config.cache_enabled { "enabled" } else { "disabled" },
            config.cache_ttl_secs
        );

        QueryEngine {
            result_cache: ResultCache::new(store.clone(), config.cache_ttl()),
            seeds: SeedStore::new(store, config.seed_ttl()),
            config,
            providers: self.providers,
            hooks: self.hooks,
            capability: self.capability,
            evaluator: self.evaluator,
            dynamic: self.dynamic,
        }
    }
}
