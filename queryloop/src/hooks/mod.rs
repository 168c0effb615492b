// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Extension hooks and injected strategies
//!
//! Every named seam is a [`FilterChain`]: callbacks run in registration
//! order, each receiving the previous value plus the query it applies to,
//! and returning a possibly modified value.

use crate::backend::RawResult;
use crate::query::QueryInstance;
use crate::types::{LoopObject, QueryIdentity, QuerySpec, QueryVars};
use std::fmt;

/// Ordered list of value-rewriting callbacks
pub struct FilterChain<T, C: ?Sized> {
    callbacks: Vec<Box<dyn Fn(T, &C) -> T + Send + Sync>>,
}

impl<T, C: ?Sized> Default for FilterChain<T, C> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<T, C: ?Sized> FilterChain<T, C> {
    pub fn add<F>(&mut self, callback: F)
    where
        F: Fn(T, &C) -> T + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn apply(&self, value: T, context: &C) -> T {
        self.callbacks
            .iter()
            .fold(value, |value, callback| callback(value, context))
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Notification-only callbacks
pub struct ObserverList<C: ?Sized> {
    callbacks: Vec<Box<dyn Fn(&C) + Send + Sync>>,
}

impl<C: ?Sized> Default for ObserverList<C> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<C: ?Sized> ObserverList<C> {
    pub fn add<F>(&mut self, callback: F)
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn notify(&self, context: &C) {
        for callback in &self.callbacks {
            callback(context);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// All hook points of the engine
#[derive(Default)]
pub struct Hooks {
    /// Rewrite the specification before preparation
    pub before_prepare: FilterChain<QuerySpec, QueryIdentity>,
    /// Rewrite the prepared tree (branch on `object_type` for domain-specific rewrites)
    pub prepared_vars: FilterChain<QueryVars, QueryIdentity>,
    /// Veto merging ambient archive parameters into the query
    pub merge_enabled: FilterChain<bool, QueryIdentity>,
    /// Veto result caching for one query
    pub use_cache: FilterChain<bool, QueryInstance>,
    pub result: FilterChain<RawResult, QueryInstance>,
    pub count: FilterChain<u64, QueryInstance>,
    pub max_pages: FilterChain<u64, QueryInstance>,
    pub start: FilterChain<u64, QueryInstance>,
    pub end: FilterChain<u64, QueryInstance>,
    /// Rewrite each item before it becomes the current loop object
    pub loop_object: FilterChain<LoopObject, QueryInstance>,
    /// Post-process each rendered fragment
    pub render_fragment: FilterChain<String, QueryInstance>,
    pub before_loop: ObserverList<QueryInstance>,
    pub after_loop: ObserverList<QueryInstance>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_prepare", &self.before_prepare.len())
            .field("prepared_vars", &self.prepared_vars.len())
            .field("merge_enabled", &self.merge_enabled.len())
            .field("use_cache", &self.use_cache.len())
            .field("result", &self.result.len())
            .field("count", &self.count.len())
            .field("max_pages", &self.max_pages.len())
            .field("start", &self.start.len())
            .field("end", &self.end.len())
            .field("loop_object", &self.loop_object.len())
            .field("render_fragment", &self.render_fragment.len())
            .field("before_loop", &self.before_loop.len())
            .field("after_loop", &self.after_loop.len())
            .finish()
    }
}

/// Capability gate consulted before a query script may run
pub trait CapabilityCheck: Send + Sync {
    fn allows_scripts(&self, identity: &QueryIdentity) -> bool;
}

impl<F> CapabilityCheck for F
where
    F: Fn(&QueryIdentity) -> bool + Send + Sync,
{
    fn allows_scripts(&self, identity: &QueryIdentity) -> bool {
        self(identity)
    }
}

/// Refuses every script
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyScripts;

impl CapabilityCheck for DenyScripts {
    fn allows_scripts(&self, _identity: &QueryIdentity) -> bool {
        false
    }
}

/// Expands dynamic expressions embedded in specification strings
pub trait DynamicData: Send + Sync {
    fn expand(&self, text: &str, item: Option<&LoopObject>) -> String;
}

/// Leaves text untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDynamicData;

impl DynamicData for NoDynamicData {
    fn expand(&self, text: &str, _item: Option<&LoopObject>) -> String {
        text.to_string()
    }
}
