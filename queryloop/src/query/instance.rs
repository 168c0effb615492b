// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query instance: resolved parameters, result, pagination and loop state

use crate::backend::RawResult;
use crate::types::{InstanceId, LoopObject, ObjectType, QueryIdentity, QuerySpec, QueryVars};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryInstance {
    pub(crate) id: InstanceId,
    pub(crate) identity: QueryIdentity,
    pub(crate) spec: QuerySpec,
    pub(crate) vars: QueryVars,
    pub(crate) result: RawResult,
    pub(crate) count: u64,
    pub(crate) max_page: u64,
    pub(crate) start: u64,
    pub(crate) end: u64,
    pub(crate) page: u64,
    pub(crate) per_page: i64,
    pub(crate) is_looping: bool,
    pub(crate) loop_index: u64,
    pub(crate) loop_object: Option<LoopObject>,
    pub(crate) loop_object_id: Option<u64>,
    pub(crate) loop_object_type: Option<String>,
    pub(crate) is_fallback: bool,
    pub(crate) from_cache: bool,
    pub(crate) from_history: bool,
    pub(crate) script_error: Option<String>,
}

impl QueryInstance {
    pub(crate) fn new(id: InstanceId, identity: QueryIdentity, spec: QuerySpec) -> Self {
        Self {
            id,
            identity,
            spec,
            vars: QueryVars::new(),
            result: RawResult::empty(),
            count: 0,
            max_page: 0,
            start: 0,
            end: 0,
            page: 1,
            per_page: 0,
            is_looping: false,
            loop_index: 0,
            loop_object: None,
            loop_object_id: None,
            loop_object_type: None,
            is_fallback: false,
            from_cache: false,
            from_history: false,
            script_error: None,
        }
    }

    /// Fresh live copy of a history snapshot
    pub(crate) fn revive(&self, id: InstanceId) -> Self {
        Self {
            id,
            is_looping: false,
            loop_index: 0,
            loop_object: None,
            loop_object_id: None,
            loop_object_type: None,
            from_history: true,
            ..self.clone()
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn identity(&self) -> &QueryIdentity {
        &self.identity
    }

    pub fn element_id(&self) -> &str {
        &self.identity.element_id
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.identity.object_type
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Resolved parameter tree sent to the backend
    pub fn vars(&self) -> &QueryVars {
        &self.vars
    }

    pub fn result(&self) -> &RawResult {
        &self.result
    }

    pub fn items(&self) -> &[LoopObject] {
        &self.result.items
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max_page(&self) -> u64 {
        self.max_page
    }

    /// 1-based index of the first item on this page, 0 when empty
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn loop_index(&self) -> u64 {
        self.loop_index
    }

    pub fn loop_object(&self) -> Option<&LoopObject> {
        self.loop_object.as_ref()
    }

    pub fn loop_object_id(&self) -> Option<u64> {
        self.loop_object_id
    }

    pub fn loop_object_type(&self) -> Option<&str> {
        self.loop_object_type.as_deref()
    }

    /// Reduced single-row query run only for its side effects
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn from_history(&self) -> bool {
        self.from_history
    }

    pub fn script_error(&self) -> Option<&str> {
        self.script_error.as_deref()
    }
}
