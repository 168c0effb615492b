// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query-var preparation
//!
//! Turns a declarative [`QuerySpec`](crate::types::QuerySpec) into the
//! backend-ready parameter tree:
//! - Object-type resolution and the before-prepare hook
//! - Marker stripping and meta-sort key cleanup
//! - Optional script escape hatch behind a capability gate
//! - Clause-tree and ordering normalization
//! - Per-domain resolution (content items, terms, accounts, custom)
//! - Include/exclude correction

pub mod clauses;
pub mod ids;
mod prepare;
mod source;

pub use prepare::{prepare, PrepareContext, Prepared};
pub use source::{DeclarativeSource, JsonScriptEvaluator, ParameterSource, ScriptEvaluator, ScriptSource};

/// Parameter-tree key names shared by preparation, merging and providers
pub mod keys {
    pub const ITEM_TYPE: &str = "item_type";
    pub const STATUS: &str = "status";
    pub const MIME_TYPE: &str = "mime_type";
    pub const TAXONOMY: &str = "taxonomy";
    pub const ROLE: &str = "role";

    pub const PER_PAGE: &str = "per_page";
    pub const NUMBER: &str = "number";
    pub const PAGE: &str = "page";
    pub const OFFSET: &str = "offset";
    pub const ORIGINAL_OFFSET: &str = "original_offset";

    pub const INCLUDE: &str = "include";
    pub const EXCLUDE: &str = "exclude";
    pub const OBJECT_IDS: &str = "object_ids";
    pub const HIDE_EMPTY: &str = "hide_empty";

    pub const TAX_QUERY: &str = "tax_query";
    pub const META_QUERY: &str = "meta_query";

    pub const ORDERBY: &str = "orderby";
    pub const ORDER: &str = "order";
    pub const META_KEY: &str = "meta_key";
    pub const RAND_SEED: &str = "rand_seed";

    pub const IS_FALLBACK: &str = "is_fallback";

    /// Front-end behaviour markers that mean nothing to a backend
    pub const MARKERS: &[&str] = &[
        "infinite_scroll",
        "infinite_scroll_margin",
        "infinite_scroll_delay",
        "live_search",
        "is_live_search",
    ];

    /// Keys only content-item backends understand
    pub const CONTENT_ONLY: &[&str] = &[ITEM_TYPE, STATUS, MIME_TYPE, TAX_QUERY, PER_PAGE, PAGE];

    /// Clause-tree keys
    pub const CLAUSE_KEYS: &[&str] = &[TAX_QUERY, META_QUERY];

    /// Clears ordering entirely
    pub const ORDER_USE_DEFAULT: &str = "_default";
    pub const ORDER_INCLUDE: &str = "include";
    pub const ORDER_NAME: &str = "name";
    pub const ORDER_RANDOM: &str = "rand";
    pub const ORDER_RELEVANCE: &str = "relevance";
    pub const ORDER_META: &str = "meta_value";
    pub const ORDER_META_NUMERIC: &str = "meta_value_num";

    /// Ordering keys that discard every other key when present
    pub const EXCLUSIVE_ORDER_KEYS: &[&str] =
        &[ORDER_INCLUDE, ORDER_NAME, ORDER_RANDOM, ORDER_RELEVANCE];
}
