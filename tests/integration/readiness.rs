//! Integration tests for template readiness tracking
//!
//! Tests cover:
//! - Idempotent loader installation
//! - Loader invoked only when someone waits, and only once
//! - FIFO resolution of waiters
//! - Stalled loaders never resolving

use super::test_utils::{payload, registry_with_log, LoaderCounter, Recorder};
use pagectx::{Bundle, Registry, TemplateState};
use std::time::Duration;

#[tokio::test]
async fn test_second_install_keeps_first_loader() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let first = LoaderCounter::new();
    let second = LoaderCounter::new();

    registry.register(payload("c1", &["app/index"])).unwrap();
    registry.install_bundle(
        Bundle::new().template("app/index", first.loader(vec![recorder.module("first")])),
    );
    registry.install_bundle(
        Bundle::new().template("app/index", second.loader(vec![recorder.module("second")])),
    );

    registry.request_invocation("c1");
    let run = recorder.next().await;
    assert_eq!(run.label, "first");
    recorder.assert_quiet().await;

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn test_install_after_load_does_not_reinvoke() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.register(payload("c1", &["app/index"])).unwrap();
    registry.install_bundle(
        Bundle::new().template("app/index", counter.loader(vec![recorder.module("index")])),
    );
    registry.request_invocation("c1");
    recorder.next().await;

    let late = LoaderCounter::new();
    registry.install_bundle(
        Bundle::new().template("app/index", late.loader(vec![recorder.module("late")])),
    );
    registry.request_invocation("c1");
    assert_eq!(recorder.next().await.label, "index");

    assert_eq!(counter.calls(), 1);
    assert_eq!(late.calls(), 0);
}

#[tokio::test]
async fn test_loader_waits_for_demand() {
    let registry = Registry::new().unwrap();
    let counter = LoaderCounter::new();

    registry.install_bundle(
        Bundle::new()
            .template("app/used", counter.loader(vec![]))
            .template("app/unused", counter.loader(vec![])),
    );
    assert_eq!(counter.calls(), 0);
    assert_eq!(registry.template_state("app/used"), Some(TemplateState::LoaderPending));

    let ready = tokio::time::timeout(Duration::from_secs(1), registry.wait_ready("app/used"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ready.name(), "app/used");
    assert_eq!(counter.calls(), 1);
    assert_eq!(registry.template_state("app/used"), Some(TemplateState::Ready));
    assert_eq!(registry.template_state("app/unused"), Some(TemplateState::LoaderPending));
}

#[tokio::test]
async fn test_late_waiter_resolves_without_reloading() {
    let registry = Registry::new().unwrap();
    let recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.install_bundle(Bundle::new().template(
        "app/index",
        counter.loader(vec![recorder.module("a"), recorder.module("b")]),
    ));
    let first = registry.wait_ready("app/index").await.unwrap();
    let second = registry.wait_ready("app/index").await.unwrap();

    assert_eq!(first.modules().len(), 2);
    assert_eq!(second.modules()[1].specifier(), "b.js");
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn test_waiters_resolve_in_fifo_order() {
    let registry = Registry::new().unwrap();
    let mut recorder = Recorder::new();
    let counter = LoaderCounter::new();

    registry.register(payload("A", &["shared/widget"])).unwrap();
    registry.register(payload("B", &["shared/widget"])).unwrap();
    registry.request_invocation("A");
    registry.request_invocation("B");

    registry.install_bundle(
        Bundle::new().template("shared/widget", counter.loader(vec![recorder.module("widget")])),
    );

    let runs = recorder.take(2).await;
    let order: Vec<&str> = runs.iter().map(|r| r.context_id.as_str()).collect();
    assert_eq!(order, vec!["A", "B"]);
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn test_stalled_loader_never_resolves() {
    let (registry, lines) = registry_with_log();
    let counter = LoaderCounter::new();

    registry
        .register(payload("c1", &["app/slow"]).with_log(true))
        .unwrap();
    registry.install_bundle(Bundle::new().template("app/slow", counter.stalled_loader()));
    registry.request_invocation("c1");

    let waited =
        tokio::time::timeout(Duration::from_millis(50), registry.wait_ready("app/slow")).await;
    assert!(waited.is_err());
    assert_eq!(registry.template_state("app/slow"), Some(TemplateState::LoaderRunning));
    assert_eq!(counter.calls(), 1);
    assert_eq!(registry.invocation_stats("c1").unwrap().pending, 1);

    let lines = lines.lock();
    assert!(lines.iter().any(|l| l == "[pagectx] app/slow - calling loader"));
    assert!(lines.iter().any(|l| l == "[pagectx] app/slow - waiting on dynamic imports"));
}

#[tokio::test]
async fn test_missing_bundle_is_logged() {
    let (registry, lines) = registry_with_log();
    registry
        .register(payload("c1", &["app/nobundle"]).with_log(true))
        .unwrap();
    registry.request_invocation("c1");

    assert_eq!(registry.template_state("app/nobundle"), Some(TemplateState::NoLoader));
    assert!(lines
        .lock()
        .iter()
        .any(|l| l == "[pagectx] app/nobundle - waiting for bundle"));
}

#[tokio::test]
async fn test_diagnostics_off_by_default() {
    let (registry, lines) = registry_with_log();
    registry.register(payload("c1", &["app/quiet"])).unwrap();
    registry.request_invocation("c1");
    assert!(lines.lock().is_empty());
}
