// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Render sessions
//!
//! A [`RenderSession`] is the explicit state of one render pass: the arena
//! of live query instances, the context registry of looping instances, the
//! history table, and the current item. It is passed down the call chain
//! (render callbacks receive it mutably) instead of living in globals, so
//! nothing leaks into later, unrelated passes.

mod history;
mod registry;

pub use history::{HistoryKey, HistoryTable};
pub use registry::ContextRegistry;

use crate::engine::QueryEngine;
use crate::query::QueryInstance;
use crate::types::{InstanceId, LoopObject, QueryIdentity, QueryVars};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the render pass happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// End-visitor rendering; the only mode that caches results
    #[default]
    Frontend,
    /// Live preview of unsaved changes
    Preview,
    /// Inside the builder canvas
    Builder,
}

/// Everything about the surrounding request a query may read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientContext {
    pub mode: RenderMode,
    /// Item of the page itself (e.g. the post being viewed)
    pub current_item: Option<LoopObject>,
    /// Parameters of the archive being viewed, merged into content queries as a base
    pub archive_vars: Option<QueryVars>,
    /// Explicit page request, e.g. from an incremental-loading call
    pub page_override: Option<u64>,
    /// Page from the request's pagination segment
    pub paged_override: Option<u64>,
    /// Viewer may see developer-facing error strings
    pub developer: bool,
}

impl AmbientContext {
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_current_item(mut self, item: LoopObject) -> Self {
        self.current_item = Some(item);
        self
    }

    pub fn with_archive_vars(mut self, vars: QueryVars) -> Self {
        self.archive_vars = Some(vars);
        self
    }

    pub fn caches_results(&self) -> bool {
        self.mode == RenderMode::Frontend
    }

    pub fn shows_developer_errors(&self) -> bool {
        self.developer || self.mode != RenderMode::Frontend
    }
}

pub struct RenderSession<'e> {
    pub(crate) engine: &'e QueryEngine,
    pub(crate) ambient: AmbientContext,
    pub(crate) instances: BTreeMap<InstanceId, QueryInstance>,
    pub(crate) registry: ContextRegistry,
    pub(crate) history: HistoryTable,
    pub(crate) current_item: Option<LoopObject>,
    next_id: u64,
}

impl<'e> RenderSession<'e> {
    pub(crate) fn new(engine: &'e QueryEngine, ambient: AmbientContext) -> Self {
        let current_item = ambient.current_item.clone();
        Self {
            engine,
            ambient,
            instances: BTreeMap::new(),
            registry: ContextRegistry::new(),
            history: HistoryTable::new(),
            current_item,
            next_id: 1,
        }
    }

    pub fn engine(&self) -> &'e QueryEngine {
        self.engine
    }

    pub fn ambient(&self) -> &AmbientContext {
        &self.ambient
    }

    pub(crate) fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn instance(&self, id: InstanceId) -> Option<&QueryInstance> {
        self.instances.get(&id)
    }

    /// Number of live (not yet destroyed) instances
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn history(&self) -> &HistoryTable {
        &self.history
    }

    /// Remove an instance from the session. A looping instance also leaves
    /// the context registry. Returns false if it was already gone.
    pub fn destroy(&mut self, id: InstanceId) -> bool {
        let Some(instance) = self.instances.remove(&id) else {
            return false;
        };
        if self.registry.remove(id) {
            self.restore_current_item();
        }
        debug!("Destroyed query instance {} of '{}'", id, instance.element_id());
        true
    }

    /// Most recently created live instance of an element
    pub fn query_for_element(&self, element_id: &str) -> Option<&QueryInstance> {
        self.instances
            .values()
            .rev()
            .find(|instance| instance.element_id() == element_id)
    }

    pub fn is_any_looping(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn looping_level(&self) -> usize {
        self.registry.depth()
    }

    /// Looping instance at `level`; 0 is the innermost loop
    pub fn looping_query(&self, level: usize) -> Option<&QueryInstance> {
        self.registry
            .at_level(level)
            .and_then(|id| self.instances.get(&id))
    }

    pub fn looping_object(&self, level: usize) -> Option<&LoopObject> {
        self.looping_query(level)
            .and_then(|instance| instance.loop_object())
    }

    pub fn looping_object_id(&self, level: usize) -> Option<u64> {
        self.looping_query(level)
            .and_then(|instance| instance.loop_object_id())
    }

    /// The innermost loop's item, or the ambient item outside any loop
    pub fn current_item(&self) -> Option<&LoopObject> {
        self.current_item.as_ref()
    }

    pub(crate) fn nearest_looping(&self) -> Option<&QueryInstance> {
        self.looping_query(0)
    }

    pub(crate) fn restore_current_item(&mut self) {
        self.current_item = self
            .nearest_looping()
            .and_then(|instance| instance.loop_object().cloned())
            .or_else(|| self.ambient.current_item.clone());
    }

    /// History identity of `identity` under the current nesting.
    ///
    /// `None` when the looping ancestor's current item has no id: such an
    /// instance is recomputed every time.
    pub(crate) fn history_key(&self, identity: &QueryIdentity) -> Option<HistoryKey> {
        match self.nearest_looping() {
            None => Some(HistoryKey::root(identity.full_id())),
            Some(ancestor) => {
                let item_id = ancestor.loop_object_id()?;
                Some(HistoryKey::nested(
                    ancestor.identity().full_id(),
                    item_id,
                    identity.full_id(),
                ))
            }
        }
    }
}
