// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Merge engine
//!
//! Deterministically combines a base parameter tree with an incoming one.
//! The incoming tree wins on conflict; clause trees, id lists and ordering
//! maps get key-specific treatment. The result is idempotent:
//! `merge(merge(a, b), b) == merge(a, b)`.

use crate::types::QueryVars;
use crate::vars::clauses;
use crate::vars::ids::{correct_include_exclude, ids_of, ids_value, intersect_ids};
use crate::vars::keys::*;
use serde_json::Value;

/// Keys whose incoming value replaces the base wholesale
const WHOLESALE_KEYS: &[&str] = &[
    PER_PAGE,
    NUMBER,
    PAGE,
    OFFSET,
    ORIGINAL_OFFSET,
    ITEM_TYPE,
    TAXONOMY,
    ROLE,
    STATUS,
    MIME_TYPE,
];

/// Id-list keys merged by set intersection
const INTERSECT_KEYS: &[&str] = &[INCLUDE, EXCLUDE, OBJECT_IDS];

/// Merge `incoming` over `base`, then re-run the include/exclude correction
pub fn merge_vars(base: &QueryVars, incoming: &QueryVars) -> QueryVars {
    let mut merged = merge_maps(base, incoming);
    correct_include_exclude(&mut merged);
    merged
}

fn merge_maps(base: &QueryVars, incoming: &QueryVars) -> QueryVars {
    let mut out = base.clone();
    for (key, incoming_value) in incoming {
        let merged = match out.get(key) {
            None => incoming_value.clone(),
            Some(base_value) => merge_value(key, base_value, incoming_value),
        };
        out.insert(key.clone(), merged);
    }
    out
}

fn merge_value(key: &str, base: &Value, incoming: &Value) -> Value {
    if WHOLESALE_KEYS.contains(&key) {
        return incoming.clone();
    }
    if INTERSECT_KEYS.contains(&key) {
        return ids_value(&intersect_ids(&ids_of(base), &ids_of(incoming)));
    }
    if CLAUSE_KEYS.contains(&key) {
        return merge_clauses(base, incoming);
    }
    if key == ORDERBY {
        return merge_ordering(base, incoming);
    }

    match (base, incoming) {
        (Value::Object(b), Value::Object(i)) => Value::Object(merge_maps(b, i)),
        (Value::Array(b), Value::Array(i)) => {
            let mut union = b.clone();
            for value in i {
                if !union.contains(value) {
                    union.push(value.clone());
                }
            }
            Value::Array(union)
        }
        _ => incoming.clone(),
    }
}

/// Merge clause trees leaf by leaf on their natural key
fn merge_clauses(base: &Value, incoming: &Value) -> Value {
    let (base_relation, mut leaves) = clauses::split(base);
    let (incoming_relation, incoming_leaves) = clauses::split(incoming);

    for leaf in incoming_leaves {
        let existing = clauses::natural_key(&leaf).and_then(|key| {
            leaves
                .iter_mut()
                .find(|candidate| clauses::natural_key(candidate).as_deref() == Some(key.as_str()))
        });
        match existing {
            Some(existing) => clauses::union_leaf_values(existing, &leaf),
            None => {
                if !leaves.contains(&leaf) {
                    leaves.push(leaf);
                }
            }
        }
    }

    clauses::build(incoming_relation.or(base_relation), leaves)
}

/// Incoming ordering keys first, then base keys it does not mention
fn merge_ordering(base: &Value, incoming: &Value) -> Value {
    match (base, incoming) {
        (Value::Object(b), Value::Object(i)) => {
            let mut out = i.clone();
            for (key, direction) in b {
                if !out.contains_key(key) {
                    out.insert(key.clone(), direction.clone());
                }
            }
            Value::Object(out)
        }
        _ => incoming.clone(),
    }
}
