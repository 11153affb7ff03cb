//! Integration tests for bounded batch dispatch.

mod common;

use babel_abstraction::ErrorKind;
use babel_core::{BatchJob, ConcurrencyDispatcher, SqliteEntryStore, VariantOutcome};
use common::{SlowClient, fast_retry, orchestrator};
use std::sync::Arc;
use std::time::Duration;

fn dispatcher(client: Arc<SlowClient>) -> ConcurrencyDispatcher {
    let store = Arc::new(SqliteEntryStore::open_in_memory().unwrap());
    ConcurrencyDispatcher::new(Arc::new(orchestrator(client, store, fast_retry())))
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_calls_never_exceed_limit() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(50)));
    let job = BatchJob::new("Hello", ["ja", "fr", "de", "es", "it"], 2);

    let report = dispatcher(client.clone()).run(job).await.unwrap();

    assert_eq!(report.total_variants(), 5);
    assert!(report.is_complete_success());
    assert_eq!(client.calls(), 5);
    assert_eq!(client.max_in_flight(), 2);
    // Three rounds of two workers.
    assert_eq!(report.total_duration, Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_workers_capped_by_variant_count() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(20)));
    let job = BatchJob::new("Hello", ["ja", "fr", "de"], 16);

    let report = dispatcher(client.clone()).run(job).await.unwrap();

    assert_eq!(report.total_variants(), 3);
    assert_eq!(client.max_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failing_variant_does_not_abort_siblings() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(10)).failing_for(&["ko"]));
    let job = BatchJob::new("Hello", ["ja", "ko", "fr", "de"], 2);

    let report = dispatcher(client.clone()).run(job).await.unwrap();

    assert_eq!(report.successful, 3);
    assert_eq!(report.failed, 1);
    assert!((report.success_rate - 75.0).abs() < f64::EPSILON);

    let Some(VariantOutcome::Failed(record)) = report.get("ko") else {
        panic!("expected ko to fail");
    };
    assert_eq!(record.kind, ErrorKind::AuthFailure);
    assert_eq!(record.attempts, 1);

    let Some(VariantOutcome::Translated(ja)) = report.get("ja") else {
        panic!("expected ja to succeed");
    };
    assert_eq!(ja.output, "ja:Hello");
}

#[tokio::test(start_paused = true)]
async fn test_source_variant_resolves_without_provider_call() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(10)));
    let job = BatchJob::new("Bonjour", ["fr", "en"], 2).with_source("fr");

    let report = dispatcher(client.clone()).run(job).await.unwrap();

    let Some(VariantOutcome::Translated(same)) = report.get("fr") else {
        panic!("expected fr to resolve");
    };
    assert_eq!(same.output, "Bonjour");
    assert!(!same.served_from_cache);
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_batch_is_served_from_cache() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(10)));
    let dispatcher = dispatcher(client.clone());

    dispatcher.run(BatchJob::new("Hello", ["ja", "fr"], 2)).await.unwrap();
    let report = dispatcher.run(BatchJob::new("Hello", ["ja", "fr"], 2)).await.unwrap();

    assert_eq!(client.calls(), 2);
    assert!(report.outcomes.values().all(|outcome| matches!(
        outcome,
        VariantOutcome::Translated(t) if t.served_from_cache
    )));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_batch_finishes_in_flight_but_starts_nothing_new() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(100)));
    let dispatcher = dispatcher(client.clone());
    let job = BatchJob::new("Hello", ["de", "fr", "ja"], 1);

    // The first variant completes at 100ms and the second is in flight at 150ms.
    let abandoned = tokio::time::timeout(Duration::from_millis(150), dispatcher.run(job)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.calls(), 2);
}
