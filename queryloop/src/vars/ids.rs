// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Id-list parsing and the include/exclude correction

use super::keys::{EXCLUDE, INCLUDE};
use crate::hooks::DynamicData;
use crate::types::{LoopObject, QueryVars};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Id that matches nothing. An empty include list would mean "no restriction".
pub const ZERO_MATCH_ID: u64 = 0;

static ID_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i),|<br\s*/?>").expect("separator pattern is valid"));

/// Parse an id list from a number, an array, or a separated string.
///
/// Strings are expanded through `dynamic` first and may hold
/// `taxonomy::id` tokens. Unparseable parts are dropped; order is kept and
/// duplicates removed.
pub fn parse_id_list(value: &Value, dynamic: &dyn DynamicData, item: Option<&LoopObject>) -> Vec<u64> {
    let mut ids = Vec::new();
    collect_ids(value, dynamic, item, &mut ids);
    dedup(ids)
}

fn collect_ids(value: &Value, dynamic: &dyn DynamicData, item: Option<&LoopObject>, out: &mut Vec<u64>) {
    match value {
        Value::Number(n) => out.extend(n.as_u64()),
        Value::String(s) => {
            let expanded = dynamic.expand(s, item);
            out.extend(ID_SEPARATOR.split(&expanded).filter_map(parse_id_token));
        }
        Value::Array(items) => {
            for item_value in items {
                collect_ids(item_value, dynamic, item, out);
            }
        }
        _ => {}
    }
}

/// Parse `12` or `category::12`
fn parse_id_token(token: &str) -> Option<u64> {
    let token = token.trim();
    let raw = match token.rsplit_once("::") {
        Some((_, id)) => id,
        None => token,
    };
    raw.trim().parse().ok()
}

/// Split a `taxonomy::id` token
pub fn parse_term_token(token: &str) -> Option<(String, u64)> {
    let (taxonomy, id) = token.trim().split_once("::")?;
    if taxonomy.is_empty() {
        return None;
    }
    Some((taxonomy.to_string(), id.trim().parse().ok()?))
}

/// Read ids already resolved into a parameter tree
pub fn ids_of(value: &Value) -> Vec<u64> {
    match value {
        Value::Number(n) => n.as_u64().into_iter().collect(),
        Value::String(s) => ID_SEPARATOR.split(s).filter_map(parse_id_token).collect(),
        Value::Array(items) => dedup(items.iter().flat_map(ids_of).collect()),
        _ => Vec::new(),
    }
}

pub fn ids_value(ids: &[u64]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
}

/// Intersect two id lists, forcing the zero-match sentinel when nothing is left
pub fn intersect_ids(a: &[u64], b: &[u64]) -> Vec<u64> {
    let shared: Vec<u64> = a.iter().copied().filter(|id| b.contains(id)).collect();
    if shared.is_empty() {
        vec![ZERO_MATCH_ID]
    } else {
        dedup(shared)
    }
}

/// Remove excluded ids from the include list.
///
/// If nothing is left the include list becomes the zero-match sentinel.
/// Idempotent: it runs after preparation and again after every merge.
pub fn correct_include_exclude(vars: &mut QueryVars) {
    let include = match vars.get(INCLUDE) {
        Some(value) => ids_of(value),
        None => return,
    };
    if include.is_empty() {
        return;
    }
    let exclude = vars.get(EXCLUDE).map(ids_of).unwrap_or_default();
    if exclude.is_empty() {
        return;
    }

    let mut corrected: Vec<u64> = include.into_iter().filter(|id| !exclude.contains(id)).collect();
    if corrected.is_empty() {
        corrected.push(ZERO_MATCH_ID);
    }
    vars.insert(INCLUDE.to_string(), ids_value(&corrected));
}

fn dedup(ids: Vec<u64>) -> Vec<u64> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoDynamicData;
    use serde_json::json;

    fn vars(value: Value) -> QueryVars {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_separated_strings() {
        let ids = parse_id_list(&json!("1, 2<br>3<BR />4,,x"), &NoDynamicData, None);
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_mixed_array_and_tokens() {
        let ids = parse_id_list(&json!([5, "category::7", "5"]), &NoDynamicData, None);
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn test_term_token() {
        assert_eq!(parse_term_token("category::12"), Some(("category".to_string(), 12)));
        assert_eq!(parse_term_token("::12"), None);
        assert_eq!(parse_term_token("category::abc"), None);
    }

    #[test]
    fn test_correction_removes_excluded_ids() {
        let mut v = vars(json!({"include": [1, 2, 3], "exclude": [2]}));
        correct_include_exclude(&mut v);
        assert_eq!(v["include"], json!([1, 3]));
    }

    #[test]
    fn test_correction_forces_sentinel() {
        let mut v = vars(json!({"include": [2], "exclude": [2]}));
        correct_include_exclude(&mut v);
        assert_eq!(v["include"], json!([0]));
    }

    #[test]
    fn test_correction_is_idempotent() {
        for input in [
            json!({"include": [1, 2, 3], "exclude": [2]}),
            json!({"include": [2], "exclude": [2, 0]}),
            json!({"include": [4], "exclude": []}),
            json!({"exclude": [4]}),
        ] {
            let mut once = vars(input);
            correct_include_exclude(&mut once);
            let mut twice = once.clone();
            correct_include_exclude(&mut twice);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_intersection_sentinel() {
        assert_eq!(intersect_ids(&[1, 2, 3], &[3, 2]), vec![2, 3]);
        assert_eq!(intersect_ids(&[1], &[2]), vec![ZERO_MATCH_ID]);
    }
}
