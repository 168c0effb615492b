// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Loop execution
//!
//! An instance moves `idle -> looping -> idle`. Entering the loop hands out
//! a [`LoopGuard`]; dropping it leaves the loop on every exit path, popping
//! the context registry and restoring the current item.

use crate::error::{QueryError, Result};
use crate::pagination::initial_loop_index;
use crate::query::QueryInstance;
use crate::session::RenderSession;
use crate::types::{InstanceId, LoopObject, QueryIdentity, QuerySpec};
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Per-item render callback. Receives the session with the loop active.
pub type RenderItem<'r, 'e> = dyn FnMut(&mut RenderSession<'e>, &LoopObject) -> String + 'r;

/// Scoped loop acquisition. Derefs to the session.
pub struct LoopGuard<'s, 'e> {
    session: &'s mut RenderSession<'e>,
    id: InstanceId,
}

impl<'s, 'e> LoopGuard<'s, 'e> {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Render one item of the guarded loop
    pub fn render_item<F>(&mut self, item: &LoopObject, mut render_item: F) -> String
    where
        F: FnMut(&mut RenderSession<'e>, &LoopObject) -> String,
    {
        let id = self.id;
        self.session.iterate(id, item, &mut render_item)
    }
}

impl<'e> Deref for LoopGuard<'_, 'e> {
    type Target = RenderSession<'e>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<'e> DerefMut for LoopGuard<'_, 'e> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for LoopGuard<'_, '_> {
    fn drop(&mut self) {
        self.session.leave_loop(self.id);
    }
}

impl<'e> RenderSession<'e> {
    /// Start looping `id`: push it onto the context registry and set its
    /// absolute starting index.
    pub fn enter_loop(&mut self, id: InstanceId) -> Result<LoopGuard<'_, 'e>> {
        let engine = self.engine;
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(QueryError::UnknownInstance(id))?;
        if instance.is_looping {
            return Err(QueryError::AlreadyLooping(id));
        }

        instance.is_looping = true;
        instance.loop_index = initial_loop_index(instance.page, instance.per_page);
        engine.hooks().before_loop.notify(instance);
        debug!(
            "Entered loop of '{}' at depth {}",
            instance.identity.full_id(),
            self.registry.depth() + 1
        );

        self.registry.push(id);
        Ok(LoopGuard { session: self, id })
    }

    pub(crate) fn leave_loop(&mut self, id: InstanceId) {
        self.registry.remove(id);

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.is_looping = false;
            instance.loop_object = None;
            instance.loop_object_id = None;
            instance.loop_object_type = None;
            self.engine.hooks().after_loop.notify(instance);
            debug!("Left loop of '{}'", instance.identity.full_id());
        }
        self.restore_current_item();
    }

    /// Render every item of `id` through `render_item` and concatenate the
    /// fragments.
    ///
    /// An empty result renders the no-results content instead, after
    /// running the fallback query when side effects must be preserved.
    pub fn render<F>(&mut self, id: InstanceId, mut render_item: F) -> String
    where
        F: FnMut(&mut RenderSession<'e>, &LoopObject) -> String,
    {
        let Some(instance) = self.instances.get(&id) else {
            warn!("Render requested for unknown query instance {}", id);
            return String::new();
        };
        if instance.count == 0 {
            return self.render_empty(id, &mut render_item);
        }

        let items = instance.result.items.clone();
        let mut guard = match self.enter_loop(id) {
            Ok(guard) => guard,
            Err(err) => {
                warn!("{}", err);
                return String::new();
            }
        };

        let mut output = String::new();
        for item in &items {
            output.push_str(&guard.iterate(id, item, &mut render_item));
        }
        output
    }

    pub(crate) fn iterate(&mut self, id: InstanceId, item: &LoopObject, render_item: &mut RenderItem<'_, 'e>) -> String {
        let engine = self.engine;
        let Some(instance) = self.instances.get_mut(&id) else {
            return String::new();
        };

        let object = engine.hooks().loop_object.apply(item.clone(), instance);
        let provider = engine.providers().get(&instance.identity.object_type).ok();
        let (object_id, object_type) = match &provider {
            Some(provider) => (provider.loop_object_id(&object), provider.loop_object_type(&object)),
            None => (object.id, object.kind.clone()),
        };
        instance.loop_object = Some(object.clone());
        instance.loop_object_id = object_id;
        instance.loop_object_type = Some(object_type);
        self.current_item = Some(object.clone());

        let fragment = render_item(self, &object);

        // The callback may have destroyed the instance
        let Some(instance) = self.instances.get_mut(&id) else {
            return fragment;
        };
        let fragment = substitute_placeholders(&fragment, instance);
        let fragment = engine.dynamic().expand(&fragment, Some(&object));
        let fragment = engine.hooks().render_fragment.apply(fragment, instance);
        instance.loop_index += 1;
        fragment
    }

    fn render_empty(&mut self, id: InstanceId, render_item: &mut RenderItem<'_, 'e>) -> String {
        let Some(instance) = self.instances.get(&id) else {
            return String::new();
        };
        let identity = instance.identity.clone();
        let spec = instance.spec.clone();
        let script_error = instance.script_error.clone();

        if spec.preserve_side_effects {
            let discarded = self.run_fallback(identity.clone(), spec.clone(), render_item);
            debug!(
                "Discarded {} bytes of fallback output for '{}'",
                discarded.len(),
                identity.full_id()
            );
        }

        let mut output = String::new();
        if let Some(error) = script_error.filter(|_| self.ambient.shows_developer_errors()) {
            output.push_str(&format!("Query error in '{}': {}", identity.full_id(), error));
        }
        if let Some(no_results) = &spec.no_results {
            let expanded = self.engine.dynamic().expand(no_results, self.current_item.as_ref());
            output.push_str(&expanded);
        }
        output
    }

    /// Loop once over the reduced fallback query; returns the fragment so
    /// the caller can drop it
    fn run_fallback(
        &mut self,
        identity: QueryIdentity,
        spec: QuerySpec,
        render_item: &mut RenderItem<'_, 'e>,
    ) -> String {
        let id = self.allocate_id();
        let mut instance = self.execute(id, identity, spec, true);
        let item = synthetic_item(&mut instance);
        self.instances.insert(id, instance);

        let fragment = match self.enter_loop(id) {
            Ok(mut guard) => guard.iterate(id, &item, render_item),
            Err(err) => {
                warn!("{}", err);
                String::new()
            }
        };
        self.instances.remove(&id);
        fragment
    }
}

/// The single item a fallback loop iterates: the backend's first row, or
/// an anonymous placeholder when the backend has none
fn synthetic_item(instance: &mut QueryInstance) -> LoopObject {
    instance.result.items.truncate(1);
    match instance.result.items.first() {
        Some(item) => item.clone(),
        None => {
            let item = LoopObject::anonymous(instance.identity.object_type.as_str());
            instance.result.items.push(item.clone());
            item
        }
    }
}

fn substitute_placeholders(fragment: &str, instance: &QueryInstance) -> String {
    if !fragment.contains('{') {
        return fragment.to_string();
    }
    let object_id = instance
        .loop_object_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    let object_type = instance.loop_object_type.as_deref().unwrap_or("");

    fragment
        .replace("{loop_index}", &instance.loop_index.to_string())
        .replace("{loop_object_id}", &object_id)
        .replace("{loop_object_type}", object_type)
}
