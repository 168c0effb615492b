// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QueryLoop - data-bound loop execution for visual page composition
//!
//! A visual block bound to a repeating data set (content items, taxonomy
//! terms, accounts or any custom provider) is rendered once per matching
//! item. This crate owns everything between the declarative query
//! specification and the per-item render callback:
//!
//! - Query-var preparation ([`vars`])
//! - Deterministic parameter-tree merging ([`merge`])
//! - Per-domain pagination arithmetic ([`pagination`])
//! - Fingerprinted result caching and session-stable random seeds ([`cache`])
//! - Nested loop execution with an explicit render session ([`session`], [`query`])
//!
//! # Example
//!
//! ```ignore
//! use queryloop::{AmbientContext, EngineConfig, ObjectType, QueryEngine, QuerySpec};
//!
//! let engine = QueryEngine::builder(EngineConfig::default())
//!     .with_provider(ObjectType::ContentItem, provider)
//!     .build();
//!
//! let mut session = engine.session(AmbientContext::default());
//! let id = session.query("brxe-posts", QuerySpec::default());
//! let html = session.render(id, |_session, item| format!("<li>{:?}</li>", item.id));
//! session.destroy(id);
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod merge;
pub mod pagination;
pub mod query;
pub mod session;
pub mod types;
pub mod vars;

pub use backend::{DataProvider, MemoryProvider, ProviderRegistry, RawResult};
pub use cache::{MemoryTtlStore, ResultCache, SeedStore, TtlStore};
pub use config::EngineConfig;
pub use engine::{QueryEngine, QueryEngineBuilder};
pub use error::{QueryError, Result};
pub use hooks::{CapabilityCheck, DynamicData, Hooks};
pub use merge::merge_vars;
pub use pagination::{PageWindow, Paginator};
pub use query::{LoopGuard, QueryInstance};
pub use session::{AmbientContext, RenderMode, RenderSession};
pub use types::{
    Direction, InstanceId, LoopObject, ObjectType, OrderTerm, QueryIdentity, QuerySpec, QueryVars,
};
pub use vars::{prepare, PrepareContext, Prepared};
