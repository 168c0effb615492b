// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution: history lookup, preparation, cached fetch, pagination

use super::QueryInstance;
use crate::backend::{DataProvider, RawResult};
use crate::cache::ResultCacheKey;
use crate::error::Result;
use crate::hooks::Hooks;
use crate::pagination::{PageWindow, Paginator};
use crate::session::RenderSession;
use crate::types::{InstanceId, QueryIdentity, QuerySpec, QueryVars};
use crate::vars::keys::{
    EXCLUDE, INCLUDE, IS_FALLBACK, META_QUERY, OBJECT_IDS, ORDERBY, ORDER_RANDOM, RAND_SEED, TAX_QUERY,
};
use crate::vars::{prepare, PrepareContext};
use log::{debug, warn};
use serde_json::Value;

/// Filter keys dropped from the reduced fallback query
const FALLBACK_STRIPPED: &[&str] = &[TAX_QUERY, META_QUERY, INCLUDE, EXCLUDE, OBJECT_IDS];

impl<'e> RenderSession<'e> {
    /// Create (or reuse from history) the query instance of `element_id`.
    ///
    /// Never fails: every error degrades to an instance with `count == 0`.
    pub fn query(&mut self, element_id: &str, spec: QuerySpec) -> InstanceId {
        self.query_instance(element_id, None, spec)
    }

    /// Like [`query`](Self::query), for elements rendered more than once
    /// per pass (e.g. components) and told apart by `suffix`
    pub fn query_instance(&mut self, element_id: &str, suffix: Option<&str>, spec: QuerySpec) -> InstanceId {
        let identity = QueryIdentity::new(element_id, spec.resolved_object_type()).with_suffix(suffix);
        let id = self.allocate_id();
        let history_key = self.history_key(&identity);

        if let Some(snapshot) = history_key.as_ref().and_then(|key| self.history.get(key)) {
            debug!("Reusing resolved query of '{}' from history", identity.full_id());
            let revived = snapshot.revive(id);
            self.instances.insert(id, revived);
            return id;
        }

        let instance = self.execute(id, identity, spec, false);
        match history_key {
            Some(key) => self.history.insert(key, instance.clone()),
            None => debug!(
                "No history identity for '{}': looping ancestor item has no id",
                instance.identity.full_id()
            ),
        }
        self.instances.insert(id, instance);
        id
    }

    pub(crate) fn execute(
        &self,
        id: InstanceId,
        identity: QueryIdentity,
        spec: QuerySpec,
        fallback: bool,
    ) -> QueryInstance {
        let engine = self.engine;
        let mut instance = QueryInstance::new(id, identity, spec);
        instance.is_fallback = fallback;

        let provider = match engine.providers().get(&instance.identity.object_type) {
            Ok(provider) => provider,
            Err(err) => {
                warn!("Query '{}' not executed: {}", instance.identity.full_id(), err);
                return instance;
            }
        };
        let paginator = provider.paginator(&instance.identity.object_type);

        let ancestor = self.nearest_looping();
        let ctx = PrepareContext {
            identity: &instance.identity,
            config: engine.config(),
            ambient: &self.ambient,
            ancestor_item: ancestor.and_then(|a| a.loop_object()),
            hooks: engine.hooks(),
            dynamic: engine.dynamic(),
            capability: engine.capability(),
            evaluator: engine.evaluator(),
            paginator,
        };
        let prepared = prepare(&instance.spec, &ctx);

        let mut vars = prepared.vars;
        let (page, per_page) = if fallback {
            reduce_to_fallback(&mut vars, paginator);
            (1, 1)
        } else {
            (prepared.page, prepared.per_page)
        };
        if orders_randomly(&vars) {
            let seed = engine
                .seeds()
                .seed_for(&instance.identity.full_id(), instance.spec.random_seed_ttl);
            if let Some(seed) = seed {
                vars.insert(RAND_SEED.to_string(), Value::from(seed));
            }
        }

        instance.vars = vars;
        instance.page = page;
        instance.per_page = per_page;
        instance.script_error = prepared.script_error;

        let ancestor_id = ancestor.and_then(|a| a.loop_object_id()).unwrap_or(0);
        let (raw, from_cache) = self.fetch(&instance, provider.as_ref(), ancestor_id);
        instance.from_cache = from_cache;
        apply_result(&mut instance, raw, paginator, engine.hooks());

        debug!(
            "Query '{}' resolved: count={} page={}/{} window={}..{}",
            instance.identity.full_id(),
            instance.count,
            instance.page,
            instance.max_page,
            instance.start,
            instance.end
        );
        instance
    }

    /// Cached lookup or backend execution. Failures yield an empty result
    /// that is never cached.
    fn fetch(&self, instance: &QueryInstance, provider: &dyn DataProvider, ancestor_id: u64) -> (RawResult, bool) {
        let engine = self.engine;
        let cache = engine.result_cache();
        let key = if self.uses_cache(instance) {
            cache_key(instance, ancestor_id)
                .map_err(|err| warn!("Result cache skipped for '{}': {}", instance.identity.full_id(), err))
                .ok()
        } else {
            None
        };

        if let Some(hit) = key.as_ref().and_then(|key| cache.get(key)) {
            return (hit, true);
        }

        match provider.execute(&instance.identity.object_type, &instance.vars) {
            Ok(raw) => {
                if let Some(key) = &key {
                    cache.insert(key, &raw);
                }
                (raw, false)
            }
            Err(err) => {
                warn!(
                    "Backend '{}' failed for '{}': {}",
                    provider.name(),
                    instance.identity.full_id(),
                    err
                );
                (RawResult::empty(), false)
            }
        }
    }

    fn uses_cache(&self, instance: &QueryInstance) -> bool {
        let engine = self.engine;
        engine.config().cache_enabled
            && self.ambient.caches_results()
            && engine.hooks().use_cache.apply(true, instance)
    }
}

fn cache_key(instance: &QueryInstance, ancestor_id: u64) -> Result<ResultCacheKey> {
    ResultCacheKey::new(&instance.identity.full_id(), &instance.vars, ancestor_id)
}

fn orders_randomly(vars: &QueryVars) -> bool {
    matches!(vars.get(ORDERBY), Some(Value::Object(keys)) if keys.contains_key(ORDER_RANDOM))
}

/// Single row, no filters, tagged so its fingerprint never matches a real query
fn reduce_to_fallback(vars: &mut QueryVars, paginator: &dyn Paginator) {
    for key in FALLBACK_STRIPPED {
        vars.remove(*key);
    }
    paginator.single_row(vars);
    vars.insert(IS_FALLBACK.to_string(), Value::Bool(true));
}

fn apply_result(
    instance: &mut QueryInstance,
    raw: RawResult,
    paginator: &dyn Paginator,
    hooks: &Hooks,
) {
    instance.result = hooks.result.apply(raw, instance);

    let count = paginator.corrected_count(&instance.vars, instance.result.total);
    instance.count = hooks.count.apply(count, instance);

    let window = PageWindow::compute(instance.page, instance.per_page, instance.count);
    instance.max_page = hooks.max_pages.apply(window.max_page, instance);
    instance.start = hooks.start.apply(window.start, instance);
    instance.end = hooks.end.apply(window.end, instance);
}
