// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pagination calculator
//!
//! [`PageWindow`] holds the backend-independent page arithmetic. Backends
//! differ in how a page is requested, which is what [`Paginator`]
//! abstracts:
//! - [`NativeLimit`]: backend takes page + page size (content items)
//! - [`OffsetOnly`]: backend only takes limit + offset (terms, accounts)

use crate::types::{ObjectType, QueryVars};
use crate::vars::keys::{NUMBER, OFFSET, ORIGINAL_OFFSET, PAGE, PER_PAGE};
use serde_json::Value;
use std::fmt;

/// Page size meaning "all rows"
pub const ALL_ROWS: i64 = -1;

/// Resolved page bounds. `start`/`end` are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageWindow {
    pub max_page: u64,
    pub start: u64,
    pub end: u64,
}

impl PageWindow {
    pub fn compute(page: u64, per_page: i64, count: u64) -> Self {
        let page = page.max(1);

        if per_page <= 0 {
            let (start, end) = if count == 0 { (0, 0) } else { (1, count) };
            return Self {
                max_page: 1,
                start,
                end,
            };
        }

        let size = per_page as u64;
        let max_page = count.div_ceil(size);
        if count == 0 {
            return Self {
                max_page,
                start: 0,
                end: 0,
            };
        }

        let start = (page - 1)
            .checked_mul(size)
            .and_then(|skipped| skipped.checked_add(1))
            .unwrap_or(u64::MAX);
        if start > count {
            // Past the last page
            return Self {
                max_page,
                start: 0,
                end: 0,
            };
        }

        Self {
            max_page,
            start,
            end: start.saturating_add(size - 1).min(count),
        }
    }
}

/// Absolute index of the first item on `page`, so continuation requests
/// (incremental loading) keep counting where the previous page stopped.
pub fn initial_loop_index(page: u64, per_page: i64) -> u64 {
    if per_page <= 0 || page <= 1 {
        0
    } else {
        (page - 1).saturating_mul(per_page as u64)
    }
}

/// How a backend is asked for one page
pub trait Paginator: Send + Sync + fmt::Debug {
    /// Write page request keys into `vars`
    fn apply(&self, vars: &mut QueryVars, page: u64, per_page: i64);

    /// Backend total minus rows skipped by the caller's own offset
    fn corrected_count(&self, vars: &QueryVars, raw_total: u64) -> u64;

    /// Recover `(page, per_page)` from vars that bypassed preparation
    fn window_inputs(&self, vars: &QueryVars, default_per_page: i64) -> (u64, i64);

    /// Reset to a single-row request with no offset
    fn single_row(&self, vars: &mut QueryVars) {
        vars.remove(OFFSET);
        vars.remove(ORIGINAL_OFFSET);
        self.apply(vars, 1, 1);
    }
}

/// Backend pages natively from `page` + `per_page`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLimit;

impl Paginator for NativeLimit {
    fn apply(&self, vars: &mut QueryVars, page: u64, per_page: i64) {
        vars.insert(PER_PAGE.to_string(), Value::from(per_page));
        vars.insert(PAGE.to_string(), Value::from(page.max(1)));
    }

    fn corrected_count(&self, vars: &QueryVars, raw_total: u64) -> u64 {
        let offset = vars.get(OFFSET).and_then(Value::as_u64).unwrap_or(0);
        raw_total.saturating_sub(offset)
    }

    fn window_inputs(&self, vars: &QueryVars, default_per_page: i64) -> (u64, i64) {
        let page = vars.get(PAGE).and_then(Value::as_u64).unwrap_or(1).max(1);
        let per_page = vars
            .get(PER_PAGE)
            .and_then(Value::as_i64)
            .unwrap_or(default_per_page);
        (page, per_page)
    }
}

/// Backend only understands a row limit and an offset.
///
/// The caller's own offset is kept under `original_offset`, so applying a
/// page twice never compounds.
#[derive(Debug, Clone, Copy)]
pub struct OffsetOnly {
    limit_key: &'static str,
    /// Limit value the backend reads as "no limit"
    unlimited: i64,
}

impl OffsetOnly {
    /// Term backends read a zero limit as "all"
    pub const fn terms() -> Self {
        Self {
            limit_key: NUMBER,
            unlimited: 0,
        }
    }

    /// Account backends read a negative limit as "all"
    pub const fn accounts() -> Self {
        Self {
            limit_key: NUMBER,
            unlimited: ALL_ROWS,
        }
    }

    fn user_offset(vars: &QueryVars) -> u64 {
        vars.get(ORIGINAL_OFFSET)
            .or_else(|| vars.get(OFFSET))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

impl Paginator for OffsetOnly {
    fn apply(&self, vars: &mut QueryVars, page: u64, per_page: i64) {
        let user_offset = Self::user_offset(vars);
        let limit = if per_page > 0 { per_page } else { self.unlimited };
        let effective = if page > 1 && per_page > 0 {
            user_offset.saturating_add((page - 1).saturating_mul(per_page as u64))
        } else {
            user_offset
        };

        vars.remove(PAGE);
        vars.remove(PER_PAGE);
        vars.insert(self.limit_key.to_string(), Value::from(limit));
        vars.insert(OFFSET.to_string(), Value::from(effective));
        vars.insert(ORIGINAL_OFFSET.to_string(), Value::from(user_offset));
    }

    fn corrected_count(&self, vars: &QueryVars, raw_total: u64) -> u64 {
        raw_total.saturating_sub(Self::user_offset(vars))
    }

    fn window_inputs(&self, vars: &QueryVars, default_per_page: i64) -> (u64, i64) {
        let per_page = match vars.get(self.limit_key).and_then(Value::as_i64) {
            Some(limit) if limit > 0 => limit,
            Some(_) => ALL_ROWS,
            None => default_per_page,
        };
        let skipped = vars
            .get(OFFSET)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            .saturating_sub(Self::user_offset(vars));
        let page = if per_page > 0 {
            skipped / per_page as u64 + 1
        } else {
            1
        };
        (page, per_page)
    }
}

static NATIVE_LIMIT: NativeLimit = NativeLimit;
static TERM_OFFSETS: OffsetOnly = OffsetOnly::terms();
static ACCOUNT_OFFSETS: OffsetOnly = OffsetOnly::accounts();

/// Default strategy per domain; custom providers page natively unless they say otherwise
pub fn for_object_type(object_type: &ObjectType) -> &'static dyn Paginator {
    match object_type {
        ObjectType::Term => &TERM_OFFSETS,
        ObjectType::Account => &ACCOUNT_OFFSETS,
        ObjectType::ContentItem | ObjectType::Custom(_) => &NATIVE_LIMIT,
    }
}
