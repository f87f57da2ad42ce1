//! Integration tests for invocation counting and chain dispatch
//!
//! Tests cover:
//! - Exactly-once import with N executions
//! - Chain order on every drain pass
//! - Partial chains waiting for the missing bundle
//! - Script scope binding while module code runs

use super::test_utils::{payload, values, LoaderCounter, Recorder};
use pagectx::{Bundle, Module, Registry, Selector, TemplateState};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_import_once_execute_n_times() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.register(payload("c1", &["app/list"])).unwrap();
    for _ in 0..4 {
        registry.request_invocation("c1");
    }
    registry.install_bundle(
        Bundle::new().template("app/list", counter.loader(vec![recorder.module("list")])),
    );

    let runs = recorder.take(4).await;
    assert!(runs.iter().all(|r| r.context_id == "c1"));
    recorder.assert_quiet().await;

    assert_eq!(counter.calls(), 1);
    let stats = registry.invocation_stats("c1").unwrap();
    assert_eq!(stats.requested, 4);
    assert_eq!(stats.executed, 4);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_chain_order_every_pass() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry
        .register(payload("c1", &["base", "child"]))
        .unwrap();
    for _ in 0..3 {
        registry.request_invocation("c1");
    }

    // child's bundle arrives before base's; execution order still follows the chain
    registry.install_bundle(
        Bundle::new().template("child", counter.loader(vec![recorder.module("child")])),
    );
    registry.install_bundle(
        Bundle::new().template("base", counter.loader(vec![recorder.module("base")])),
    );

    let runs = recorder.take(6).await;
    let labels: Vec<&str> = runs.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["base", "child", "base", "child", "base", "child"]
    );
    recorder.assert_quiet().await;
    assert_eq!(counter.calls(), 2);
}

#[tokio::test]
async fn test_modules_run_in_loader_order() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.register(payload("c1", &["app/page"])).unwrap();
    registry.install_bundle(Bundle::new().template(
        "app/page",
        counter.loader(vec![
            recorder.module("first"),
            Module::side_effect("page.css"),
            recorder.module("second"),
        ]),
    ));
    registry.request_invocation("c1");

    let labels: Vec<String> = recorder.take(2).await.into_iter().map(|r| r.label).collect();
    assert_eq!(labels, vec!["first", "second"]);
    recorder.assert_quiet().await;
}

#[tokio::test]
async fn test_partial_chain_waits_for_every_template() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry
        .register(payload("c1", &["app/base", "app/detail"]))
        .unwrap();
    registry.request_invocation("c1");
    registry.install_bundle(
        Bundle::new().template("app/base", counter.loader(vec![recorder.module("base")])),
    );
    recorder.assert_quiet().await;
    assert_eq!(registry.template_state("app/base"), Some(TemplateState::Ready));
    assert_eq!(registry.template_state("app/detail"), Some(TemplateState::NoLoader));

    registry.install_bundle(
        Bundle::new().template("app/detail", counter.loader(vec![recorder.module("detail")])),
    );
    let labels: Vec<String> = recorder.take(2).await.into_iter().map(|r| r.label).collect();
    assert_eq!(labels, vec!["base", "detail"]);
}

#[tokio::test]
async fn test_requests_after_ready_run_again() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.register(payload("c1", &["app/index"])).unwrap();
    registry.install_bundle(
        Bundle::new().template("app/index", counter.loader(vec![recorder.module("index")])),
    );

    registry.request_invocation("c1");
    recorder.next().await;
    registry.request_invocation("c1");
    recorder.next().await;
    recorder.assert_quiet().await;

    assert_eq!(counter.calls(), 1);
    assert_eq!(registry.invocation_stats("c1").unwrap().executed, 2);
}

#[tokio::test]
async fn test_module_receives_context_values() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry
        .register(payload("c1", &["app/form"]).with_values(values(&[("name", json!("Ada"))])))
        .unwrap();
    registry
        .register(payload("c2", &["app/form"]).with_values(values(&[("name", json!("Grace"))])))
        .unwrap();
    registry.install_bundle(
        Bundle::new().template("app/form", counter.loader(vec![recorder.module("form")])),
    );
    registry.request_invocation("c2");
    registry.request_invocation("c1");

    let runs = recorder.take(2).await;
    for run in runs {
        let expected = if run.context_id == "c1" { "Ada" } else { "Grace" };
        assert_eq!(run.values.get("name"), Some(&json!(expected)));
    }
}

#[tokio::test]
async fn test_current_selector_inside_module_code() {
    let registry = Registry::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

    registry.register(payload("c1", &["app/a"])).unwrap();
    registry.register(payload("c2", &["app/b"])).unwrap();

    let lookup = registry.clone();
    let seen_by_module = Arc::clone(&seen);
    let module = Module::with_default("a.js", move |ctx, _| {
        let current = lookup.get_all(Selector::Current).unwrap();
        seen_by_module
            .lock()
            .push((ctx.id().to_string(), current[0].id().to_string()));
        let _ = done_tx.send(());
    });
    registry.install_bundle(Bundle::new().template("app/a", move || vec![module.ready()]));
    registry.request_invocation("c1");

    tokio::time::timeout(Duration::from_secs(1), done_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        seen.lock().as_slice(),
        &[("c1".to_string(), "c1".to_string())]
    );

    // outside module code the last registration is in scope again
    assert_eq!(registry.get_all(Selector::Current).unwrap()[0].id(), "c2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_current_selector_with_concurrent_drains() {
    let registry = Registry::new().unwrap();
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

    let lookup = registry.clone();
    let module = Module::with_default("t.js", move |ctx, _| {
        let current = lookup
            .get_all(Selector::Current)
            .ok()
            .and_then(|found| found.first().map(|c| c.id().to_string()));
        let _ = seen_tx.send((ctx.id().to_string(), current));
    });
    registry.install_bundle(Bundle::new().template("t", move || vec![module.ready()]));

    for i in 0..64 {
        let id = format!("c{}", i);
        registry.register(payload(&id, &["t"])).unwrap();
        registry.request_invocation(&id);
    }

    for _ in 0..64 {
        let (executing, current) = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.as_deref(), Some(executing.as_str()));
    }
    assert_eq!(registry.get_all(Selector::Current).unwrap()[0].id(), "c63");
}

#[tokio::test]
async fn test_unknown_context_request_is_ignored() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.install_bundle(
        Bundle::new().template("app/index", counter.loader(vec![recorder.module("index")])),
    );
    registry.request_invocation("never-registered");

    recorder.assert_quiet().await;
    assert_eq!(counter.calls(), 0);
    assert!(registry.invocation_stats("never-registered").is_none());
}
