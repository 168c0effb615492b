// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Integration tests for pagination across backends and random ordering

use queryloop::{
    AmbientContext, Direction, EngineConfig, LoopObject, MemoryProvider, ObjectType, OrderTerm, QueryEngine,
    QuerySpec,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_engine() -> QueryEngine {
    let posts = (1..=25).map(|id| {
        LoopObject::new(id, "content")
            .with_field("item_type", "post")
            .with_field("title", format!("Post {}", id))
    });
    let terms = (101..=120).map(|id| {
        LoopObject::new(id, "term")
            .with_field("taxonomy", "category")
            .with_field("count", 1)
    });
    let accounts = (1..=7).map(|id| {
        LoopObject::new(id, "account").with_field("role", if id % 2 == 0 { "editor" } else { "author" })
    });
    let store = Arc::new(MemoryProvider::new("memory").with_objects(posts.chain(terms).chain(accounts)));

    QueryEngine::builder(EngineConfig::default())
        .with_provider(ObjectType::ContentItem, store.clone())
        .with_provider(ObjectType::Term, store.clone())
        .with_provider(ObjectType::Account, store)
        .build()
}

fn ids(engine: &QueryEngine, ambient: AmbientContext, element_id: &str, spec: QuerySpec) -> Vec<u64> {
    let mut session = engine.session(ambient);
    let id = session.query(element_id, spec);
    session
        .instance(id)
        .map(|instance| instance.items().iter().filter_map(|item| item.id).collect())
        .unwrap_or_default()
}

#[test]
fn should_offset_term_pages_without_compounding() {
    init_logging();
    let engine = create_engine();
    let mut session = engine.session(AmbientContext::default());

    let spec = QuerySpec {
        per_page: Some(5),
        offset: Some(3),
        page: Some(2),
        orderby: vec![OrderTerm::new("id", Direction::Asc)],
        ..QuerySpec::new(ObjectType::Term)
    };
    let id = session.query("terms", spec);
    let instance = session.instance(id).unwrap();

    assert_eq!(instance.vars()["offset"], json!(8));
    assert_eq!(instance.vars()["original_offset"], json!(3));
    assert_eq!(instance.count(), 17);
    assert_eq!((instance.start(), instance.end(), instance.max_page()), (6, 10, 4));

    let rendered = session.render(id, |_, item| format!("{};", item.id.unwrap()));
    assert_eq!(rendered, "109;110;111;112;113;");
}

#[test]
fn should_return_all_accounts_for_unlimited_page_size() {
    init_logging();
    let engine = create_engine();
    let mut session = engine.session(AmbientContext::default());

    let spec = QuerySpec {
        per_page: Some(-1),
        ..QuerySpec::new(ObjectType::Account).with_var("role", "editor")
    };
    let id = session.query("editors", spec);
    let instance = session.instance(id).unwrap();

    assert_eq!(instance.vars()["number"], json!(-1));
    assert_eq!(instance.count(), 3);
    assert_eq!((instance.start(), instance.end(), instance.max_page()), (1, 3, 1));
}

#[test]
fn should_prefer_ambient_page_override() {
    init_logging();
    let engine = create_engine();
    let ambient = AmbientContext {
        page_override: Some(3),
        ..Default::default()
    };
    let mut session = engine.session(ambient);

    let spec = QuerySpec {
        per_page: Some(10),
        page: Some(1),
        orderby: vec![OrderTerm::new("id", Direction::Asc)],
        ..Default::default()
    };
    let id = session.query("posts", spec);
    let instance = session.instance(id).unwrap();
    assert_eq!((instance.start(), instance.end()), (21, 25));

    let rendered = session.render(id, |_, _| "{loop_index},".to_string());
    assert_eq!(rendered, "20,21,22,23,24,");
}

#[test]
fn should_render_nothing_for_an_overflowing_page_override() {
    init_logging();
    let engine = create_engine();
    let ambient = AmbientContext {
        page_override: Some(u64::MAX / 4),
        ..Default::default()
    };
    let mut session = engine.session(ambient);

    let id = session.query("posts", QuerySpec::default());
    let instance = session.instance(id).unwrap();
    assert!(instance.items().is_empty());
    assert_eq!((instance.start(), instance.end()), (0, 0));

    let rendered = session.render(id, |_, item| format!("{};", item.id.unwrap()));
    assert_eq!(rendered, "");
}

#[test]
fn should_keep_random_pages_disjoint_within_seed_lifetime() {
    init_logging();
    let engine = create_engine();
    let random_page = |page| QuerySpec {
        per_page: Some(10),
        page: Some(page),
        orderby: vec![OrderTerm::key("rand")],
        ..Default::default()
    };

    let pages: Vec<Vec<u64>> = (1..=3)
        .map(|page| ids(&engine, AmbientContext::default(), "shuffled", random_page(page)))
        .collect();

    let first: HashSet<u64> = pages[0].iter().copied().collect();
    let second: HashSet<u64> = pages[1].iter().copied().collect();
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
    assert!(first.is_disjoint(&second));

    let everything: HashSet<u64> = pages.iter().flatten().copied().collect();
    assert_eq!(everything.len(), 25);

    assert!(engine.seeds().invalidate("shuffled"));
}

#[test]
fn should_skip_seed_when_ttl_is_zero() {
    init_logging();
    let engine = create_engine();
    let mut session = engine.session(AmbientContext::default());

    let spec = QuerySpec {
        orderby: vec![OrderTerm::key("rand")],
        random_seed_ttl: Some(0),
        ..Default::default()
    };
    let id = session.query("unseeded", spec);
    assert!(session.instance(id).unwrap().vars().get("rand_seed").is_none());
    assert!(!engine.seeds().invalidate("unseeded"));
}

#[test]
fn should_merge_archive_parameters_as_base() {
    init_logging();
    let engine = create_engine();
    let archive = json!({"search": "post 1", "per_page": 50}).as_object().cloned().unwrap();
    let ambient = AmbientContext::default().with_archive_vars(archive);

    let spec = QuerySpec {
        per_page: Some(4),
        orderby: vec![OrderTerm::new("id", Direction::Asc)],
        ..Default::default()
    };
    assert_eq!(ids(&engine, ambient.clone(), "search", spec.clone()), vec![1, 10, 11, 12]);

    let isolated = QuerySpec {
        disable_merge: true,
        ..spec
    };
    assert_eq!(ids(&engine, ambient, "search", isolated), vec![1, 2, 3, 4]);
}

#[test]
fn should_query_the_archive_item_type_when_element_leaves_it_unset() {
    init_logging();
    let posts = (1..=5).map(|id| LoopObject::new(id, "content").with_field("item_type", "post"));
    let products = (201..=203).map(|id| LoopObject::new(id, "content").with_field("item_type", "product"));
    let store = Arc::new(MemoryProvider::new("shop").with_objects(posts.chain(products)));
    let engine = QueryEngine::builder(EngineConfig::default())
        .with_provider(ObjectType::ContentItem, store)
        .build();

    let archive = json!({"item_type": ["product"]}).as_object().cloned().unwrap();
    let ambient = AmbientContext::default().with_archive_vars(archive);
    let mut session = engine.session(ambient);

    let spec = QuerySpec {
        orderby: vec![OrderTerm::new("id", Direction::Asc)],
        ..Default::default()
    };
    let id = session.query("shop", spec);
    let instance = session.instance(id).unwrap();
    assert_eq!(instance.vars()["item_type"], json!(["product"]));
    assert_eq!(instance.count(), 3);

    let rendered = session.render(id, |_, item| format!("{};", item.id.unwrap()));
    assert_eq!(rendered, "201;202;203;");
}
