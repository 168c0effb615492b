// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Clause trees
//!
//! A clause tree is either a plain array of leaves, or an object
//! `{"relation": "AND"|"OR", "clauses": [...]}`. A leaf is an object naming
//! a `taxonomy` (with `terms`) or an attribute `key` (with `value` and an
//! optional `compare`). A leaf that itself carries `clauses` is a nested
//! group.

use super::ids::parse_term_token;
use serde_json::{json, Map, Value};

pub const RELATION: &str = "relation";
pub const CLAUSES: &str = "clauses";
pub const NO_MERGE: &str = "no_merge";

/// Normalize any accepted clause-tree shape. `None` when no leaves remain.
pub fn normalize(value: &Value) -> Option<Value> {
    let (relation, leaves) = split(value);
    let leaves: Vec<Value> = leaves.iter().filter_map(normalize_leaf).collect();
    if leaves.is_empty() {
        return None;
    }
    Some(build(relation, leaves))
}

fn normalize_leaf(leaf: &Value) -> Option<Value> {
    let object = leaf.as_object()?;
    if object.contains_key(CLAUSES) {
        return normalize(leaf);
    }
    if !object.contains_key("taxonomy") && !object.contains_key("key") {
        return None;
    }

    let mut normalized = object.clone();
    for field in ["compare", "operator"] {
        if let Some(Value::String(op)) = normalized.get(field) {
            let upper = op.trim().to_ascii_uppercase();
            normalized.insert(field.to_string(), Value::String(upper));
        }
    }
    if let Some(Value::Array(terms)) = normalized.get("terms") {
        normalized.insert("terms".to_string(), Value::Array(dedup_values(terms)));
    }
    Some(Value::Object(normalized))
}

/// Split a tree into its relation and top-level leaves
pub fn split(value: &Value) -> (Option<String>, Vec<Value>) {
    match value {
        Value::Array(leaves) => (None, leaves.clone()),
        Value::Object(object) => {
            let relation = object
                .get(RELATION)
                .and_then(Value::as_str)
                .map(|r| r.trim().to_ascii_uppercase())
                .filter(|r| r == "AND" || r == "OR");

            let leaves = match object.get(CLAUSES) {
                Some(Value::Array(leaves)) => leaves.clone(),
                // Keyed form: every object-valued entry other than the relation
                _ if !object.contains_key("taxonomy") && !object.contains_key("key") => object
                    .iter()
                    .filter(|(k, v)| k.as_str() != RELATION && v.is_object())
                    .map(|(_, v)| v.clone())
                    .collect(),
                _ => vec![value.clone()],
            };
            (relation, leaves)
        }
        _ => (None, Vec::new()),
    }
}

pub fn build(relation: Option<String>, leaves: Vec<Value>) -> Value {
    match relation {
        Some(relation) => json!({ RELATION: relation, CLAUSES: leaves }),
        None => Value::Array(leaves),
    }
}

/// Identity used to merge leaves: taxonomy + operator, or key + comparator.
///
/// Groups and leaves flagged `no_merge` have none.
pub fn natural_key(leaf: &Value) -> Option<String> {
    let object = leaf.as_object()?;
    if object.contains_key(CLAUSES) || object.get(NO_MERGE).and_then(Value::as_bool) == Some(true) {
        return None;
    }
    if let Some(taxonomy) = object.get("taxonomy").and_then(Value::as_str) {
        let operator = object.get("operator").and_then(Value::as_str).unwrap_or("IN");
        return Some(format!("tax:{}:{}", taxonomy, operator));
    }
    let key = object.get("key").and_then(Value::as_str)?;
    let compare = object.get("compare").and_then(Value::as_str).unwrap_or("=");
    Some(format!("key:{}:{}", key, compare))
}

/// Field holding the leaf's value set
pub fn value_field(leaf: &Map<String, Value>) -> &'static str {
    if leaf.contains_key("terms") || leaf.contains_key("taxonomy") {
        "terms"
    } else {
        "value"
    }
}

/// Union `incoming`'s value set into `existing`, de-duplicated
pub fn union_leaf_values(existing: &mut Value, incoming: &Value) {
    let (Some(target), Some(source)) = (existing.as_object_mut(), incoming.as_object()) else {
        return;
    };
    let field = value_field(target);
    let Some(incoming_values) = source.get(field) else {
        return;
    };

    let merged = match target.get(field) {
        None => incoming_values.clone(),
        Some(current) if current == incoming_values => current.clone(),
        Some(current) => {
            let mut values = as_list(current);
            for value in as_list(incoming_values) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            if values.len() == 1 && !current.is_array() {
                values.remove(0)
            } else {
                Value::Array(values)
            }
        }
    };
    target.insert(field.to_string(), merged);
}

/// Build `IN` / `NOT IN` taxonomy leaves from `taxonomy::id` tokens, one per taxonomy
pub fn term_token_leaves(tokens: &[String], operator: &str) -> Vec<Value> {
    let mut grouped: Vec<(String, Vec<u64>)> = Vec::new();
    for (taxonomy, id) in tokens.iter().filter_map(|t| parse_term_token(t)) {
        match grouped.iter_mut().find(|(name, _)| *name == taxonomy) {
            Some((_, ids)) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => grouped.push((taxonomy, vec![id])),
        }
    }

    grouped
        .into_iter()
        .map(|(taxonomy, ids)| {
            json!({
                "taxonomy": taxonomy,
                "field": "term_id",
                "terms": ids,
                "operator": operator,
            })
        })
        .collect()
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values.clone(),
        other => vec![other.clone()],
    }
}

fn dedup_values(values: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_empty_leaves() {
        let tree = json!([{"taxonomy": "category", "terms": [1, 1, 2]}, {}, "junk"]);
        assert_eq!(
            normalize(&tree),
            Some(json!([{"taxonomy": "category", "terms": [1, 2]}]))
        );
        assert_eq!(normalize(&json!([])), None);
    }

    #[test]
    fn test_normalize_keyed_object_with_relation() {
        let tree = json!({
            "relation": "or",
            "0": {"key": "color", "value": "red", "compare": "like"},
            "1": {"key": "size", "value": 3}
        });
        assert_eq!(
            normalize(&tree),
            Some(json!({
                "relation": "OR",
                "clauses": [
                    {"key": "color", "value": "red", "compare": "LIKE"},
                    {"key": "size", "value": 3}
                ]
            }))
        );
    }

    #[test]
    fn test_natural_keys() {
        assert_eq!(
            natural_key(&json!({"taxonomy": "tag", "terms": [1]})).as_deref(),
            Some("tax:tag:IN")
        );
        assert_eq!(
            natural_key(&json!({"key": "price", "value": 1, "compare": ">"})).as_deref(),
            Some("key:price:>")
        );
        assert_eq!(natural_key(&json!({"key": "price", "no_merge": true})), None);
        assert_eq!(natural_key(&json!({"clauses": []})), None);
    }

    #[test]
    fn test_term_tokens_group_by_taxonomy() {
        let tokens = vec![
            "category::1".to_string(),
            "tag::9".to_string(),
            "category::2".to_string(),
            "bogus".to_string(),
        ];
        let leaves = term_token_leaves(&tokens, "NOT IN");
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0]["terms"], json!([1, 2]));
        assert_eq!(leaves[1]["taxonomy"], json!("tag"));
        assert_eq!(leaves[1]["operator"], json!("NOT IN"));
    }
}
