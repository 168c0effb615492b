// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Core data model: object domains, query specifications and loop objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Backend-ready parameter tree. Key order is preserved.
pub type QueryVars = Map<String, Value>;

/// Backend domain a query runs against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    #[default]
    ContentItem,
    Term,
    Account,
    /// Open extension point, keyed by provider name (e.g. "cart")
    Custom(String),
}

impl ObjectType {
    pub fn from_key(key: &str) -> Self {
        match key {
            "" | "content" | "content_item" | "post" => ObjectType::ContentItem,
            "term" => ObjectType::Term,
            "account" | "user" => ObjectType::Account,
            other => ObjectType::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::ContentItem => "content",
            ObjectType::Term => "term",
            ObjectType::Account => "account",
            ObjectType::Custom(key) => key,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, ObjectType::Custom(_))
    }
}

impl From<String> for ObjectType {
    fn from(key: String) -> Self {
        ObjectType::from_key(&key)
    }
}

impl From<ObjectType> for String {
    fn from(object_type: ObjectType) -> Self {
        object_type.as_str().to_string()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// One `(key, direction)` ordering pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub key: String,
    #[serde(default)]
    pub direction: Option<Direction>,
}

impl OrderTerm {
    pub fn new(key: impl Into<String>, direction: Direction) -> Self {
        Self {
            key: key.into(),
            direction: Some(direction),
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: None,
        }
    }
}

/// Declarative query specification attached to a visual element.
///
/// Keys the engine does not interpret travel in `extra` and reach the
/// backend untouched (after preparation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub object_type: Option<ObjectType>,

    // Pagination inputs
    pub per_page: Option<i64>,
    pub page: Option<u64>,
    pub offset: Option<u64>,

    // Id lists: numbers, arrays, or comma / `<br>` separated strings
    pub include: Option<Value>,
    pub exclude: Option<Value>,
    pub exclude_current: bool,

    // Clause trees
    pub tax_query: Option<Value>,
    pub meta_query: Option<Value>,
    /// `taxonomy::id` tokens restricting content items
    pub terms_include: Vec<String>,
    pub terms_exclude: Vec<String>,

    // Ordering
    pub orderby: Vec<OrderTerm>,
    pub order: Option<Direction>,
    pub meta_key: Option<String>,
    /// Seed lifetime in minutes for random ordering; `Some(0)` disables the seed
    pub random_seed_ttl: Option<u64>,

    // Flags
    pub disable_merge: bool,
    pub infinite_scroll: bool,
    pub live_search: bool,
    pub preserve_side_effects: bool,

    // Domain specifics
    pub current_item_terms: bool,
    pub current_author: bool,
    pub show_empty: bool,
    pub mime_types: Vec<String>,

    /// Escape hatch: externally evaluated parameter script
    pub script: Option<String>,
    pub no_results: Option<String>,

    #[serde(flatten)]
    pub extra: QueryVars,
}

impl QuerySpec {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type: Some(object_type),
            ..Default::default()
        }
    }

    /// Set a pass-through backend key
    pub fn with_var(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn resolved_object_type(&self) -> ObjectType {
        self.object_type.clone().unwrap_or_default()
    }
}

/// One item a loop iterates over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopObject {
    pub id: Option<u64>,
    pub kind: String,
    /// Owning account (author) id, for content items
    #[serde(default)]
    pub owner: Option<u64>,
    #[serde(default)]
    pub fields: QueryVars,
}

impl LoopObject {
    pub fn new(id: u64, kind: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            kind: kind.into(),
            owner: None,
            fields: QueryVars::new(),
        }
    }

    /// Object without a stable id (e.g. a cart line)
    pub fn anonymous(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            owner: None,
            fields: QueryVars::new(),
        }
    }

    pub fn with_owner(mut self, owner: u64) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Arena handle of a live query instance within one render session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the element a query belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryIdentity {
    pub element_id: String,
    pub instance_suffix: Option<String>,
    pub object_type: ObjectType,
}

impl QueryIdentity {
    pub fn new(element_id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            element_id: element_id.into(),
            instance_suffix: None,
            object_type,
        }
    }

    pub fn with_suffix(mut self, suffix: Option<&str>) -> Self {
        self.instance_suffix = suffix.map(str::to_string);
        self
    }

    /// Element id plus instance suffix, used for seed and cache keys
    pub fn full_id(&self) -> String {
        match &self.instance_suffix {
            Some(suffix) => format!("{}-{}", self.element_id, suffix),
            None => self.element_id.clone(),
        }
    }
}
