// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Specification → parameter tree

use super::clauses;
use super::ids::{
    correct_include_exclude, ids_of, ids_value, intersect_ids, parse_id_list, ZERO_MATCH_ID,
};
use super::keys::*;
use super::source::{DeclarativeSource, ParameterSource, ScriptEvaluator, ScriptSource};
use crate::config::EngineConfig;
use crate::hooks::{CapabilityCheck, DynamicData, Hooks};
use crate::merge::merge_vars;
use crate::pagination::{Paginator, ALL_ROWS};
use crate::session::AmbientContext;
use crate::types::{Direction, LoopObject, OrderTerm, QueryIdentity, QuerySpec, QueryVars};
use log::{debug, warn};
use serde_json::{json, Value};

/// Everything preparation may read besides the specification itself
pub struct PrepareContext<'a> {
    pub identity: &'a QueryIdentity,
    pub config: &'a EngineConfig,
    pub ambient: &'a AmbientContext,
    /// Current item of the nearest looping ancestor, if nested
    pub ancestor_item: Option<&'a LoopObject>,
    pub hooks: &'a Hooks,
    pub dynamic: &'a dyn DynamicData,
    pub capability: &'a dyn CapabilityCheck,
    pub evaluator: &'a dyn ScriptEvaluator,
    pub paginator: &'a dyn Paginator,
}

impl<'a> PrepareContext<'a> {
    /// The item "current" refers to: the ancestor loop's item, else the ambient one
    pub fn acting_item(&self) -> Option<&'a LoopObject> {
        self.ancestor_item.or(self.ambient.current_item.as_ref())
    }
}

/// Output of preparation
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub vars: QueryVars,
    pub page: u64,
    pub per_page: i64,
    /// Developer-facing script failure, if the escape hatch failed
    pub script_error: Option<String>,
}

/// Resolve a specification into backend parameters.
///
/// Never fails: a malformed specification yields an empty tree. `spec` is
/// not modified.
pub fn prepare(spec: &QuerySpec, ctx: &PrepareContext<'_>) -> Prepared {
    let mut spec = ctx.hooks.before_prepare.apply(spec.clone(), ctx.identity);

    for marker in MARKERS {
        spec.extra.remove(*marker);
    }
    spec.infinite_scroll = false;
    spec.live_search = false;

    if !orders_by_meta(&spec.orderby) {
        spec.meta_key = None;
        spec.extra.remove(META_KEY);
    }

    let mut script_error = None;
    let script = spec.script.clone().filter(|s| !s.trim().is_empty());
    let scripted = script.as_deref().and_then(|script| {
        match ScriptSource::new(script, ctx.capability, ctx.identity) {
            Ok(source) => Some(source.parameters(&spec, ctx)),
            Err(err) => {
                debug!("{}; falling back to declarative preparation", err);
                None
            }
        }
    });

    let result = scripted.unwrap_or_else(|| DeclarativeSource.parameters(&spec, ctx));
    let vars = match result {
        Ok(vars) => vars,
        Err(err) => {
            warn!("Preparing query for '{}' failed: {}", ctx.identity.element_id, err);
            script_error = Some(err.to_string());
            QueryVars::new()
        }
    };

    let vars = ctx.hooks.prepared_vars.apply(vars, ctx.identity);
    let (page, per_page) = ctx
        .paginator
        .window_inputs(&vars, ctx.config.default_per_page);

    Prepared {
        vars,
        page,
        per_page,
        script_error,
    }
}

pub(crate) fn content_vars(spec: &QuerySpec, ctx: &PrepareContext<'_>) -> QueryVars {
    let config = ctx.config;
    let mut vars = spec.extra.clone();

    apply_id_filters(&mut vars, spec, ctx, true);
    apply_clause_tree(&mut vars, TAX_QUERY, spec.tax_query.as_ref());
    apply_term_tokens(&mut vars, spec);
    apply_clause_tree(&mut vars, META_QUERY, spec.meta_query.as_ref());
    apply_ordering(&mut vars, spec);

    // Archive parameters fill only the keys the element left unset
    if !spec.disable_merge {
        if let Some(archive) = &ctx.ambient.archive_vars {
            if ctx.hooks.merge_enabled.apply(true, ctx.identity) {
                vars = merge_vars(archive, &vars);
            }
        }
    }

    let item_types = string_list(vars.get(ITEM_TYPE))
        .filter(|types| !types.is_empty())
        .unwrap_or_else(|| vec![config.default_item_type.clone()]);

    let attachment = &config.attachment_type;
    if !vars.contains_key(STATUS) {
        let mut status = vec!["publish".to_string()];
        if item_types.contains(attachment) {
            status.push("inherit".to_string());
        }
        vars.insert(STATUS.to_string(), json!(status));
    }
    if item_types.len() == 1 && item_types[0] == *attachment && !vars.contains_key(MIME_TYPE) {
        let mime_types = if spec.mime_types.is_empty() {
            &config.attachment_mime_types
        } else {
            &spec.mime_types
        };
        vars.insert(MIME_TYPE.to_string(), json!(mime_types));
    }
    vars.insert(ITEM_TYPE.to_string(), json!(item_types));

    apply_pagination(&mut vars, spec, ctx);
    correct_include_exclude(&mut vars);
    vars
}

pub(crate) fn term_vars(spec: &QuerySpec, ctx: &PrepareContext<'_>) -> QueryVars {
    let mut vars = spec.extra.clone();

    if let Some(taxonomies) = string_list(vars.get(TAXONOMY)) {
        vars.insert(TAXONOMY.to_string(), json!(taxonomies));
    }
    vars.insert(HIDE_EMPTY.to_string(), Value::Bool(!spec.show_empty));

    if spec.current_item_terms {
        let id = ctx
            .acting_item()
            .and_then(|item| item.id)
            .unwrap_or(ZERO_MATCH_ID);
        vars.insert(OBJECT_IDS.to_string(), json!([id]));
    }

    apply_id_filters(&mut vars, spec, ctx, false);
    apply_clause_tree(&mut vars, META_QUERY, spec.meta_query.as_ref());
    apply_ordering(&mut vars, spec);
    apply_pagination(&mut vars, spec, ctx);
    correct_include_exclude(&mut vars);
    vars
}

pub(crate) fn account_vars(spec: &QuerySpec, ctx: &PrepareContext<'_>) -> QueryVars {
    let mut vars = spec.extra.clone();
    for key in CONTENT_ONLY {
        vars.remove(*key);
    }

    if let Some(roles) = string_list(vars.get(ROLE)) {
        vars.insert(ROLE.to_string(), json!(roles));
    }

    apply_id_filters(&mut vars, spec, ctx, false);

    if spec.current_author {
        let owner = ctx
            .acting_item()
            .and_then(|item| item.owner)
            .unwrap_or(ZERO_MATCH_ID);
        let include = match vars.get(INCLUDE) {
            Some(existing) => intersect_ids(&ids_of(existing), &[owner]),
            None => vec![owner],
        };
        vars.insert(INCLUDE.to_string(), ids_value(&include));
    }

    apply_clause_tree(&mut vars, META_QUERY, spec.meta_query.as_ref());
    apply_ordering(&mut vars, spec);
    apply_pagination(&mut vars, spec, ctx);
    correct_include_exclude(&mut vars);
    vars
}

pub(crate) fn custom_vars(spec: &QuerySpec, ctx: &PrepareContext<'_>) -> QueryVars {
    let mut vars = spec.extra.clone();
    apply_id_filters(&mut vars, spec, ctx, false);
    apply_clause_tree(&mut vars, META_QUERY, spec.meta_query.as_ref());
    apply_ordering(&mut vars, spec);
    apply_pagination(&mut vars, spec, ctx);
    correct_include_exclude(&mut vars);
    vars
}

fn apply_id_filters(vars: &mut QueryVars, spec: &QuerySpec, ctx: &PrepareContext<'_>, exclude_current: bool) {
    let item = ctx.acting_item();

    let include = spec.include.as_ref().or_else(|| vars.get(INCLUDE)).cloned();
    if let Some(include) = include {
        let ids = parse_id_list(&include, ctx.dynamic, item);
        if ids.is_empty() {
            vars.remove(INCLUDE);
        } else {
            vars.insert(INCLUDE.to_string(), ids_value(&ids));
        }
    }

    let mut exclude = spec
        .exclude
        .as_ref()
        .or_else(|| vars.get(EXCLUDE))
        .map(|value| parse_id_list(value, ctx.dynamic, item))
        .unwrap_or_default();

    if exclude_current && spec.exclude_current {
        if let Some(id) = item.and_then(|item| item.id) {
            if !exclude.contains(&id) {
                exclude.push(id);
            }
        }
    }

    if exclude.is_empty() {
        vars.remove(EXCLUDE);
    } else {
        vars.insert(EXCLUDE.to_string(), ids_value(&exclude));
    }
}

fn apply_clause_tree(vars: &mut QueryVars, key: &str, typed: Option<&Value>) {
    let raw = typed.or_else(|| vars.get(key)).cloned();
    match raw.as_ref().and_then(clauses::normalize) {
        Some(tree) => {
            vars.insert(key.to_string(), tree);
        }
        None => {
            vars.remove(key);
        }
    }
}

/// `taxonomy::id` tokens become taxonomy leaves ANDed with any existing tree
fn apply_term_tokens(vars: &mut QueryVars, spec: &QuerySpec) {
    let mut leaves = clauses::term_token_leaves(&spec.terms_include, "IN");
    leaves.extend(clauses::term_token_leaves(&spec.terms_exclude, "NOT IN"));
    if leaves.is_empty() {
        return;
    }

    let tree = match vars.remove(TAX_QUERY) {
        None => clauses::build(None, leaves),
        Some(existing) => {
            let (relation, mut existing_leaves) = clauses::split(&existing);
            match relation.as_deref() {
                Some("OR") => {
                    let mut grouped = vec![existing];
                    grouped.extend(leaves);
                    clauses::build(Some("AND".to_string()), grouped)
                }
                _ => {
                    existing_leaves.extend(leaves);
                    clauses::build(relation, existing_leaves)
                }
            }
        }
    };
    vars.insert(TAX_QUERY.to_string(), tree);
}

enum Ordering {
    Unset,
    Cleared,
    Keys(QueryVars),
}

fn normalize_ordering(terms: &[OrderTerm], default_direction: Option<Direction>) -> Ordering {
    if terms.is_empty() {
        return Ordering::Unset;
    }
    if terms.iter().any(|t| t.key == ORDER_USE_DEFAULT) {
        return Ordering::Cleared;
    }

    let direction_of = |term: &OrderTerm| {
        term.direction
            .or(default_direction)
            .unwrap_or_default()
            .as_str()
    };

    let mut keys = QueryVars::new();
    if let Some(exclusive) = terms
        .iter()
        .find(|t| EXCLUSIVE_ORDER_KEYS.contains(&t.key.as_str()))
    {
        keys.insert(exclusive.key.clone(), json!(direction_of(exclusive)));
        return Ordering::Keys(keys);
    }

    for term in terms.iter().filter(|t| !t.key.trim().is_empty()) {
        if !keys.contains_key(&term.key) {
            keys.insert(term.key.clone(), json!(direction_of(term)));
        }
    }
    if keys.is_empty() {
        Ordering::Unset
    } else {
        Ordering::Keys(keys)
    }
}

fn apply_ordering(vars: &mut QueryVars, spec: &QuerySpec) {
    match normalize_ordering(&spec.orderby, spec.order) {
        Ordering::Unset => {}
        Ordering::Cleared => {
            vars.remove(ORDERBY);
            vars.remove(ORDER);
            vars.remove(META_KEY);
        }
        Ordering::Keys(keys) => {
            let default = spec.order.unwrap_or_default();
            vars.insert(ORDERBY.to_string(), Value::Object(keys));
            vars.insert(ORDER.to_string(), json!(default.as_str()));
        }
    }

    if let Some(meta_key) = &spec.meta_key {
        if vars.contains_key(ORDERBY) {
            vars.insert(META_KEY.to_string(), json!(meta_key));
        }
    }
}

fn apply_pagination(vars: &mut QueryVars, spec: &QuerySpec, ctx: &PrepareContext<'_>) {
    if let Some(offset) = spec.offset.filter(|offset| *offset > 0) {
        vars.insert(OFFSET.to_string(), json!(offset));
        vars.remove(ORIGINAL_OFFSET);
    }
    let page = resolve_page(spec, ctx.ambient, vars.get(PAGE).and_then(Value::as_u64));
    let per_page = resolve_per_page(
        spec.per_page.or_else(|| vars.get(PER_PAGE).and_then(Value::as_i64)),
        ctx.config.default_per_page,
    );
    ctx.paginator.apply(vars, page, per_page);
}

/// External page override > external paged override > spec page > page
/// already in the tree > 1
fn resolve_page(spec: &QuerySpec, ambient: &AmbientContext, inherited: Option<u64>) -> u64 {
    if spec.disable_merge {
        return 1;
    }
    let paged = |page: Option<u64>| page.filter(|page| *page > 0);
    paged(ambient.page_override)
        .or(paged(ambient.paged_override))
        .or(paged(spec.page))
        .or(paged(inherited))
        .unwrap_or(1)
}

fn resolve_per_page(per_page: Option<i64>, default_per_page: i64) -> i64 {
    match per_page {
        Some(ALL_ROWS) => ALL_ROWS,
        Some(size) if size > 0 => size,
        _ => default_per_page,
    }
}

fn orders_by_meta(terms: &[OrderTerm]) -> bool {
    terms
        .iter()
        .any(|t| t.key == ORDER_META || t.key == ORDER_META_NUMERIC)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{DenyScripts, NoDynamicData};
    use crate::pagination;
    use crate::types::ObjectType;
    use crate::vars::JsonScriptEvaluator;

    struct Fixture {
        identity: QueryIdentity,
        config: EngineConfig,
        ambient: AmbientContext,
        ancestor: Option<LoopObject>,
        hooks: Hooks,
        allow_scripts: bool,
    }

    impl Fixture {
        fn new(object_type: ObjectType) -> Self {
            Self {
                identity: QueryIdentity::new("el", object_type),
                config: EngineConfig::default(),
                ambient: AmbientContext::default(),
                ancestor: None,
                hooks: Hooks::default(),
                allow_scripts: false,
            }
        }

        fn run(&self, spec: &QuerySpec) -> Prepared {
            let allow = |_: &QueryIdentity| true;
            let capability: &dyn CapabilityCheck = if self.allow_scripts { &allow } else { &DenyScripts };
            let ctx = PrepareContext {
                identity: &self.identity,
                config: &self.config,
                ambient: &self.ambient,
                ancestor_item: self.ancestor.as_ref(),
                hooks: &self.hooks,
                dynamic: &NoDynamicData,
                capability,
                evaluator: &JsonScriptEvaluator,
                paginator: pagination::for_object_type(&self.identity.object_type),
            };
            prepare(spec, &ctx)
        }
    }

    fn ordering(keys: &[&str]) -> Vec<OrderTerm> {
        keys.iter().map(|k| OrderTerm::key(*k)).collect()
    }

    #[test]
    fn test_prepare_is_pure() {
        let fixture = Fixture::new(ObjectType::ContentItem);
        let spec = QuerySpec {
            include: Some(json!("3,1,2")),
            exclude: Some(json!([2])),
            orderby: ordering(&["date", "title"]),
            ..Default::default()
        };
        let before = spec.clone();

        let first = fixture.run(&spec);
        let second = fixture.run(&spec);
        assert_eq!(first, second);
        assert_eq!(spec, before);
        assert_eq!(first.vars["include"], json!([3, 1]));
    }

    #[test]
    fn test_content_defaults() {
        let prepared = Fixture::new(ObjectType::ContentItem).run(&QuerySpec::default());
        assert_eq!(prepared.vars["item_type"], json!(["post"]));
        assert_eq!(prepared.vars["status"], json!(["publish"]));
        assert_eq!(prepared.vars["per_page"], json!(10));
        assert_eq!(prepared.vars["page"], json!(1));
        assert_eq!((prepared.page, prepared.per_page), (1, 10));
    }

    #[test]
    fn test_attachment_status_and_mime_types() {
        let fixture = Fixture::new(ObjectType::ContentItem);

        let mixed = QuerySpec::default().with_var("item_type", json!(["post", "attachment"]));
        let prepared = fixture.run(&mixed);
        assert_eq!(prepared.vars["status"], json!(["publish", "inherit"]));
        assert!(prepared.vars.get("mime_type").is_none());

        let only = QuerySpec {
            mime_types: vec!["video".to_string()],
            ..QuerySpec::default().with_var("item_type", "attachment")
        };
        let prepared = fixture.run(&only);
        assert_eq!(prepared.vars["mime_type"], json!(["video"]));
    }

    #[test]
    fn test_page_precedence() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        let spec = QuerySpec {
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(fixture.run(&spec).page, 3);

        fixture.ambient.paged_override = Some(4);
        assert_eq!(fixture.run(&spec).page, 4);

        fixture.ambient.page_override = Some(5);
        assert_eq!(fixture.run(&spec).page, 5);

        let disabled = QuerySpec {
            disable_merge: true,
            ..spec
        };
        assert_eq!(fixture.run(&disabled).page, 1);
    }

    #[test]
    fn test_zero_page_sources_are_skipped() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.ambient.page_override = Some(0);
        fixture.ambient.paged_override = Some(2);
        let spec = QuerySpec {
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(fixture.run(&spec).page, 2);

        fixture.ambient.paged_override = Some(0);
        assert_eq!(fixture.run(&spec).page, 3);

        let unpaged = QuerySpec {
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(fixture.run(&unpaged).page, 1);
    }

    #[test]
    fn test_per_page_resolution() {
        let fixture = Fixture::new(ObjectType::ContentItem);
        for (input, expected) in [(None, 10), (Some(0), 10), (Some(-5), 10), (Some(-1), -1), (Some(4), 4)] {
            let spec = QuerySpec {
                per_page: input,
                ..Default::default()
            };
            assert_eq!(fixture.run(&spec).per_page, expected);
        }
    }

    #[test]
    fn test_exclude_current_prefers_ancestor_item() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.ambient.current_item = Some(LoopObject::new(7, "content"));
        let spec = QuerySpec {
            exclude_current: true,
            ..Default::default()
        };
        assert_eq!(fixture.run(&spec).vars["exclude"], json!([7]));

        fixture.ancestor = Some(LoopObject::new(42, "content"));
        assert_eq!(fixture.run(&spec).vars["exclude"], json!([42]));
    }

    #[test]
    fn test_markers_and_meta_key_stripped() {
        let fixture = Fixture::new(ObjectType::ContentItem);
        let spec = QuerySpec {
            meta_key: Some("price".to_string()),
            orderby: ordering(&["date"]),
            ..QuerySpec::default()
                .with_var("infinite_scroll", true)
                .with_var("is_live_search", true)
        };
        let prepared = fixture.run(&spec);
        assert!(prepared.vars.get("infinite_scroll").is_none());
        assert!(prepared.vars.get("is_live_search").is_none());
        assert!(prepared.vars.get("meta_key").is_none());

        let by_meta = QuerySpec {
            orderby: ordering(&["meta_value_num"]),
            ..spec
        };
        assert_eq!(fixture.run(&by_meta).vars["meta_key"], json!("price"));
    }

    #[test]
    fn test_ordering_normalization() {
        let fixture = Fixture::new(ObjectType::ContentItem);

        let spec = QuerySpec {
            orderby: vec![OrderTerm::new("date", Direction::Desc), OrderTerm::key("title")],
            order: Some(Direction::Asc),
            ..Default::default()
        };
        let vars = fixture.run(&spec).vars;
        assert_eq!(vars["orderby"], json!({"date": "DESC", "title": "ASC"}));

        let exclusive = QuerySpec {
            orderby: ordering(&["date", "rand", "title"]),
            ..Default::default()
        };
        let vars = fixture.run(&exclusive).vars;
        let keys: Vec<&String> = vars["orderby"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["rand"]);

        let cleared = QuerySpec {
            orderby: ordering(&["date", "_default"]),
            ..QuerySpec::default().with_var("orderby", json!({"legacy": "ASC"}))
        };
        let vars = fixture.run(&cleared).vars;
        assert!(vars.get("orderby").is_none());
        assert!(vars.get("order").is_none());
    }

    #[test]
    fn test_term_tokens_become_tax_leaves() {
        let fixture = Fixture::new(ObjectType::ContentItem);
        let spec = QuerySpec {
            tax_query: Some(json!([{"taxonomy": "genre", "terms": [1]}])),
            terms_include: vec!["category::4".to_string()],
            terms_exclude: vec!["category::5".to_string()],
            ..Default::default()
        };
        let tree = fixture.run(&spec).vars["tax_query"].clone();
        let leaves = tree.as_array().unwrap();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[2]["operator"], json!("NOT IN"));
    }

    #[test]
    fn test_archive_vars_merged_as_base() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.ambient.archive_vars = Some(
            json!({"search": "shoes", "tax_query": [{"taxonomy": "category", "terms": [1]}]})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let spec = QuerySpec {
            tax_query: Some(json!([{"taxonomy": "category", "terms": [2]}])),
            ..Default::default()
        };
        let vars = fixture.run(&spec).vars;
        assert_eq!(vars["search"], json!("shoes"));
        assert_eq!(vars["tax_query"], json!([{"taxonomy": "category", "terms": [1, 2]}]));

        let disabled = QuerySpec {
            disable_merge: true,
            ..spec.clone()
        };
        assert!(fixture.run(&disabled).vars.get("search").is_none());

        fixture.hooks.merge_enabled.add(|_, _| false);
        assert!(fixture.run(&spec).vars.get("search").is_none());
    }

    #[test]
    fn test_archive_fills_keys_left_unset() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.ambient.archive_vars = Some(
            json!({"item_type": ["product"], "per_page": 12, "status": ["publish", "private"]})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let prepared = fixture.run(&QuerySpec::default());
        assert_eq!(prepared.vars["item_type"], json!(["product"]));
        assert_eq!(prepared.vars["status"], json!(["publish", "private"]));
        assert_eq!(prepared.per_page, 12);

        let explicit = QuerySpec {
            per_page: Some(3),
            ..QuerySpec::default().with_var("item_type", "post")
        };
        let prepared = fixture.run(&explicit);
        assert_eq!(prepared.vars["item_type"], json!(["post"]));
        assert_eq!(prepared.per_page, 3);

        let isolated = QuerySpec {
            disable_merge: true,
            ..Default::default()
        };
        let prepared = fixture.run(&isolated);
        assert_eq!(prepared.vars["item_type"], json!(["post"]));
        assert_eq!(prepared.vars["status"], json!(["publish"]));
    }

    #[test]
    fn test_term_specifics() {
        let mut fixture = Fixture::new(ObjectType::Term);
        fixture.ancestor = Some(LoopObject::new(11, "content"));
        let spec = QuerySpec {
            per_page: Some(5),
            offset: Some(3),
            page: Some(2),
            current_item_terms: true,
            include: Some(json!(["category::4", "category::6"])),
            ..QuerySpec::default().with_var("taxonomy", "category")
        };
        let vars = fixture.run(&spec).vars;
        assert_eq!(vars["number"], json!(5));
        assert_eq!(vars["offset"], json!(8));
        assert_eq!(vars["hide_empty"], json!(true));
        assert_eq!(vars["object_ids"], json!([11]));
        assert_eq!(vars["include"], json!([4, 6]));
        assert_eq!(vars["taxonomy"], json!(["category"]));
        assert!(vars.get("page").is_none());
    }

    #[test]
    fn test_account_specifics() {
        let mut fixture = Fixture::new(ObjectType::Account);
        fixture.ambient.current_item = Some(LoopObject::new(3, "content").with_owner(9));
        let spec = QuerySpec {
            current_author: true,
            ..QuerySpec::default()
                .with_var("item_type", "post")
                .with_var("role", "editor")
        };
        let vars = fixture.run(&spec).vars;
        assert!(vars.get("item_type").is_none());
        assert_eq!(vars["include"], json!([9]));
        assert_eq!(vars["role"], json!(["editor"]));
        assert_eq!(vars["number"], json!(10));
    }

    #[test]
    fn test_script_requires_capability() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        let spec = QuerySpec {
            script: Some(r#"{"item_type": ["product"], "per_page": 3}"#.to_string()),
            ..Default::default()
        };

        let denied = fixture.run(&spec);
        assert_eq!(denied.vars["item_type"], json!(["post"]));

        fixture.allow_scripts = true;
        let allowed = fixture.run(&spec);
        assert_eq!(allowed.vars["item_type"], json!(["product"]));
        assert!(allowed.vars.get("status").is_none());
        assert_eq!(allowed.per_page, 3);
    }

    #[test]
    fn test_script_non_object_degrades_to_empty() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.allow_scripts = true;

        let array = QuerySpec {
            script: Some("[1, 2]".to_string()),
            ..Default::default()
        };
        let prepared = fixture.run(&array);
        assert!(prepared.vars.is_empty());
        assert!(prepared.script_error.is_none());

        let broken = QuerySpec {
            script: Some("{oops".to_string()),
            ..Default::default()
        };
        let prepared = fixture.run(&broken);
        assert!(prepared.vars.is_empty());
        assert!(prepared.script_error.is_some());
    }

    #[test]
    fn test_blank_custom_type_degrades_to_empty() {
        let fixture = Fixture::new(ObjectType::Custom(" ".to_string()));
        let prepared = fixture.run(&QuerySpec::default().with_var("search", "cart"));

        assert!(prepared.vars.is_empty());
        assert!(prepared
            .script_error
            .as_deref()
            .is_some_and(|error| error.starts_with("Invalid query specification")));
    }

    #[test]
    fn test_hooks_rewrite_spec_and_vars() {
        let mut fixture = Fixture::new(ObjectType::ContentItem);
        fixture.hooks.before_prepare.add(|mut spec, _| {
            spec.per_page = Some(2);
            spec
        });
        fixture.hooks.prepared_vars.add(|mut vars, identity| {
            if identity.object_type == ObjectType::ContentItem {
                vars.insert("search".to_string(), json!("hooked"));
            }
            vars
        });

        let prepared = fixture.run(&QuerySpec::default());
        assert_eq!(prepared.per_page, 2);
        assert_eq!(prepared.vars["search"], json!("hooked"));
    }
}
