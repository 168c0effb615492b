// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory data provider
//!
//! Evaluates prepared parameter trees against a vector of loop objects.
//! Objects are matched to a domain by `kind` ("content", "term",
//! "account" or the custom provider key). Recognized object fields:
//!
//! - content: `item_type`, `status`, `mime_type`, `title`, `date`,
//!   `terms` (`{taxonomy: [ids]}`), `meta` (`{key: value}`)
//! - term: `taxonomy`, `name`, `count`, `meta`
//! - account: `role` (string or array), `name`, `meta`

use super::{DataProvider, RawResult};
use crate::error::{QueryError, Result};
use crate::types::{LoopObject, ObjectType, QueryVars};
use crate::vars::clauses;
use crate::vars::ids::ids_of;
use crate::vars::keys::*;
use log::debug;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const SEARCH: &str = "search";

pub struct MemoryProvider {
    name: String,
    objects: RwLock<Vec<LoopObject>>,
    executions: AtomicU64,
    failing: AtomicBool,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(Vec::new()),
            executions: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_objects(self, objects: impl IntoIterator<Item = LoopObject>) -> Self {
        self.objects.write().extend(objects);
        self
    }

    pub fn insert(&self, object: LoopObject) {
        self.objects.write().push(object);
    }

    /// Make every subsequent execution fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of executions that reached the store
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    fn matches(&self, object: &LoopObject, vars: &QueryVars, all: &[LoopObject]) -> bool {
        if let Some(include) = vars.get(INCLUDE) {
            if !object.id.is_some_and(|id| ids_of(include).contains(&id)) {
                return false;
            }
        }
        if let Some(exclude) = vars.get(EXCLUDE) {
            if object.id.is_some_and(|id| ids_of(exclude).contains(&id)) {
                return false;
            }
        }

        let string_filters = [(ITEM_TYPE, None), (STATUS, Some("publish")), (TAXONOMY, None), (ROLE, None)];
        for (key, default) in string_filters {
            if let Some(wanted) = vars.get(key).map(strings) {
                let actual = object.field(key).map(strings).unwrap_or_else(|| {
                    default.map(|d| vec![d.to_string()]).unwrap_or_default()
                });
                if !actual.iter().any(|value| wanted.contains(value)) {
                    return false;
                }
            }
        }

        if let Some(mime_types) = vars.get(MIME_TYPE).map(strings) {
            let mime = object.field(MIME_TYPE).and_then(Value::as_str).unwrap_or("");
            if !mime_types.iter().any(|prefix| mime.starts_with(prefix.as_str())) {
                return false;
            }
        }

        if vars.get(HIDE_EMPTY).and_then(Value::as_bool) == Some(true)
            && object.field("count").and_then(Value::as_u64).unwrap_or(0) == 0
        {
            return false;
        }

        if let Some(object_ids) = vars.get(OBJECT_IDS) {
            let owners = ids_of(object_ids);
            let attached = all
                .iter()
                .filter(|o| o.id.is_some_and(|id| owners.contains(&id)))
                .any(|o| object.id.is_some_and(|id| term_ids(o, None).contains(&id)));
            if !attached {
                return false;
            }
        }

        if let Some(search) = vars.get(SEARCH).and_then(Value::as_str) {
            let needle = search.to_lowercase();
            let haystack = title(object).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }

        if let Some(tree) = vars.get(TAX_QUERY) {
            if !eval_tree(tree, &|leaf: &Map<String, Value>| tax_leaf(object, leaf)) {
                return false;
            }
        }
        if let Some(tree) = vars.get(META_QUERY) {
            if !eval_tree(tree, &|leaf: &Map<String, Value>| meta_leaf(object, leaf)) {
                return false;
            }
        }
        true
    }
}

impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, object_type: &ObjectType, vars: &QueryVars) -> Result<RawResult> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(QueryError::backend(&self.name, "store unavailable"));
        }

        let objects = self.objects.read();
        let kind = object_type.as_str();
        let mut matched: Vec<LoopObject> = objects
            .iter()
            .filter(|o| o.kind == kind)
            .filter(|o| self.matches(o, vars, &objects))
            .cloned()
            .collect();
        drop(objects);

        sort_objects(&mut matched, vars);

        let total = matched.len() as u64;
        let (skip, limit) = window(vars);
        let items: Vec<LoopObject> = matched
            .into_iter()
            .skip(skip as usize)
            .take(limit.map_or(usize::MAX, |l| l as usize))
            .collect();

        debug!(
            "Provider '{}' matched {} {} rows, returning {}",
            self.name,
            total,
            kind,
            items.len()
        );
        Ok(RawResult { items, total })
    }
}

/// `(rows to skip, row limit)` for either page-request style
fn window(vars: &QueryVars) -> (u64, Option<u64>) {
    let offset = vars.get(OFFSET).and_then(Value::as_u64).unwrap_or(0);

    if let Some(number) = vars.get(NUMBER).and_then(Value::as_i64) {
        let limit = (number > 0).then_some(number as u64);
        return (offset, limit);
    }

    match vars.get(PER_PAGE).and_then(Value::as_i64) {
        Some(per_page) if per_page > 0 => {
            let page = vars.get(PAGE).and_then(Value::as_u64).unwrap_or(1).max(1);
            let skipped = (page - 1).saturating_mul(per_page as u64);
            (offset.saturating_add(skipped), Some(per_page as u64))
        }
        _ => (offset, None),
    }
}

fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn title(object: &LoopObject) -> &str {
    object
        .field("title")
        .or_else(|| object.field("name"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn term_ids(object: &LoopObject, taxonomy: Option<&str>) -> Vec<u64> {
    let Some(Value::Object(terms)) = object.field("terms") else {
        return Vec::new();
    };
    terms
        .iter()
        .filter(|(tax, _)| taxonomy.map_or(true, |t| t == tax.as_str()))
        .flat_map(|(_, ids)| ids_of(ids))
        .collect()
}

/// Evaluate a clause tree; a plain array is an AND group
fn eval_tree(tree: &Value, leaf_test: &dyn Fn(&Map<String, Value>) -> bool) -> bool {
    let (relation, leaves) = clauses::split(tree);
    let mut results = leaves.iter().filter_map(|leaf| {
        let object = leaf.as_object()?;
        Some(if object.contains_key(clauses::CLAUSES) {
            eval_tree(leaf, leaf_test)
        } else {
            leaf_test(object)
        })
    });
    match relation.as_deref() {
        Some("OR") => results.any(|matched| matched),
        _ => results.all(|matched| matched),
    }
}

fn tax_leaf(object: &LoopObject, leaf: &Map<String, Value>) -> bool {
    let taxonomy = leaf.get("taxonomy").and_then(Value::as_str);
    let assigned: HashSet<u64> = term_ids(object, taxonomy).into_iter().collect();
    let wanted = leaf.get("terms").map(ids_of).unwrap_or_default();

    match leaf.get("operator").and_then(Value::as_str).unwrap_or("IN") {
        "NOT IN" => wanted.iter().all(|id| !assigned.contains(id)),
        "AND" => wanted.iter().all(|id| assigned.contains(id)),
        "EXISTS" => !assigned.is_empty(),
        "NOT EXISTS" => assigned.is_empty(),
        _ => wanted.iter().any(|id| assigned.contains(id)),
    }
}

fn meta_leaf(object: &LoopObject, leaf: &Map<String, Value>) -> bool {
    let Some(key) = leaf.get("key").and_then(Value::as_str) else {
        return true;
    };
    let actual = object
        .field("meta")
        .and_then(|meta| meta.get(key))
        .filter(|v| !v.is_null());
    let compare = leaf.get("compare").and_then(Value::as_str).unwrap_or("=");

    let Some(actual) = actual else {
        return compare == "NOT EXISTS" || compare == "!=" || compare == "NOT IN";
    };
    let expected = leaf.get("value").unwrap_or(&Value::Null);

    match compare {
        "EXISTS" => true,
        "NOT EXISTS" => false,
        "IN" => as_list(expected).iter().any(|v| compare_values(actual, v) == CmpOrdering::Equal),
        "NOT IN" => as_list(expected).iter().all(|v| compare_values(actual, v) != CmpOrdering::Equal),
        "LIKE" => scalar_text(actual)
            .to_lowercase()
            .contains(&scalar_text(expected).to_lowercase()),
        "!=" => compare_values(actual, expected) != CmpOrdering::Equal,
        ">" => compare_values(actual, expected) == CmpOrdering::Greater,
        ">=" => compare_values(actual, expected) != CmpOrdering::Less,
        "<" => compare_values(actual, expected) == CmpOrdering::Less,
        "<=" => compare_values(actual, expected) != CmpOrdering::Greater,
        _ => compare_values(actual, expected) == CmpOrdering::Equal,
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric when both sides parse as numbers, textual otherwise
fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

fn sort_objects(objects: &mut [LoopObject], vars: &QueryVars) {
    let Some(Value::Object(orderby)) = vars.get(ORDERBY) else {
        return;
    };

    if orderby.contains_key(ORDER_RANDOM) {
        let mut rng = match vars.get(RAND_SEED).and_then(Value::as_u64) {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        rng.shuffle(objects);
        return;
    }

    let include = vars.get(INCLUDE).map(ids_of).unwrap_or_default();
    let meta_key = vars.get(META_KEY).and_then(Value::as_str).unwrap_or("");

    objects.sort_by(|a, b| {
        for (key, direction) in orderby {
            let ordering = match key.as_str() {
                ORDER_INCLUDE => position(&include, a).cmp(&position(&include, b)),
                ORDER_NAME | "title" => title(a).cmp(title(b)),
                "id" => a.id.cmp(&b.id),
                ORDER_META | ORDER_META_NUMERIC => compare_values(
                    meta_value(a, meta_key),
                    meta_value(b, meta_key),
                ),
                field => compare_values(
                    a.field(field).unwrap_or(&Value::Null),
                    b.field(field).unwrap_or(&Value::Null),
                ),
            };
            let ordering = if direction.as_str() == Some("ASC") || key == ORDER_INCLUDE {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != CmpOrdering::Equal {
                return ordering;
            }
        }
        CmpOrdering::Equal
    });
}

fn position(include: &[u64], object: &LoopObject) -> usize {
    object
        .id
        .and_then(|id| include.iter().position(|i| *i == id))
        .unwrap_or(usize::MAX)
}

fn meta_value<'o>(object: &'o LoopObject, key: &str) -> &'o Value {
    object
        .field("meta")
        .and_then(|meta| meta.get(key))
        .unwrap_or(&Value::Null)
}
