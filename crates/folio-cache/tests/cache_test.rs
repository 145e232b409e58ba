//! Entity cache behavior against the in-memory mock backend.
//!
//! Entry age is driven by a `ManualClock`; mock latency uses tokio time, so
//! every test runs with the tokio clock paused.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use folio_cache::{CacheConfig, CacheEvent, EntityCache, EntityKind, FetchMode};
use folio_core::mock::{MockDocumentApi, MockOp};
use folio_core::{Credentials, KeyValueStore, ManualClock, MemoryStore};
use tokio::sync::broadcast;

struct Harness {
    api: MockDocumentApi,
    clock: Arc<ManualClock>,
    session: Arc<MemoryStore>,
    cache: EntityCache,
}

fn harness(api: MockDocumentApi) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let session = Arc::new(MemoryStore::new());
    let cache = EntityCache::with_clock(
        Arc::new(api.clone()),
        session.clone(),
        CacheConfig::default(),
        clock.clone(),
    );
    Harness {
        api,
        clock,
        session,
        cache,
    }
}

async fn next_event(events: &mut broadcast::Receiver<CacheEvent>) -> CacheEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for cache event")
        .expect("event channel closed")
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_share_one_fetch() {
    let h = harness(
        MockDocumentApi::new()
            .with_collection(1, "Papers")
            .with_latency(Duration::from_millis(50)),
    );
    let creds = Credentials::new();

    let (a, b, c) = tokio::join!(
        h.cache.collections(&creds, FetchMode::Cached),
        h.cache.collections(&creds, FetchMode::Cached),
        h.cache.collections(&creds, FetchMode::Cached),
    );

    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(a[0].name, "Papers");
}

#[tokio::test(start_paused = true)]
async fn test_hard_fresh_entry_is_served_without_fetch() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    h.clock.advance(ChronoDuration::seconds(5));
    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
}

#[tokio::test(start_paused = true)]
async fn test_soft_stale_entry_served_and_revalidated_once() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    h.clock.advance(ChronoDuration::seconds(15));
    h.api.rename_collection(1, "Renamed");

    let mut events = h.cache.subscribe();
    let first = h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    let second = h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    assert_eq!(first[0].name, "Papers");
    assert_eq!(second[0].name, "Papers");

    assert_eq!(
        next_event(&mut events).await,
        CacheEvent::Refreshed(EntityKind::Collections)
    );
    assert_eq!(h.api.calls(MockOp::ListCollections), 2);

    let refreshed = h.cache.peek_collections().unwrap();
    assert_eq!(refreshed[0].name, "Renamed");
    assert!(!h.cache.is_soft_stale(EntityKind::Collections));
}

#[tokio::test(start_paused = true)]
async fn test_background_mode_does_not_schedule_revalidation() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    h.clock.advance(ChronoDuration::seconds(15));
    h.cache
        .collections(&creds, FetchMode::Background)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hard_stale_entry_is_refetched_in_foreground() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    h.clock.advance(ChronoDuration::seconds(31));
    h.api.rename_collection(1, "Renamed");

    let list = h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    assert_eq!(list[0].name, "Renamed");
    assert_eq!(h.api.calls(MockOp::ListCollections), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_next_read_to_fetch() {
    let h = harness(MockDocumentApi::new().with_document(1, "a.pdf", None));
    let creds = Credentials::new();

    h.cache.documents(&creds, FetchMode::Cached).await.unwrap();
    assert!(h
        .session
        .get(EntityKind::Documents.session_key())
        .await
        .unwrap()
        .is_some());

    let mut events = h.cache.subscribe();
    h.cache.invalidate(EntityKind::Documents).await;
    assert_eq!(
        next_event(&mut events).await,
        CacheEvent::Invalidated(EntityKind::Documents)
    );
    assert!(h.cache.peek_documents().is_none());
    assert!(h.cache.fetched_at(EntityKind::Documents).is_none());
    assert!(h
        .session
        .get(EntityKind::Documents.session_key())
        .await
        .unwrap()
        .is_none());

    h.cache.documents(&creds, FetchMode::Cached).await.unwrap();
    assert_eq!(h.api.calls(MockOp::ListDocuments), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_keeps_previous_data() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    let fetched_at = h.cache.fetched_at(EntityKind::Collections);

    let mut events = h.cache.subscribe();
    h.api.fail_next(MockOp::ListCollections, 503);
    let err = h
        .cache
        .collections(&creds, FetchMode::Force)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));

    match next_event(&mut events).await {
        CacheEvent::FetchFailed { kind, error } => {
            assert_eq!(kind, EntityKind::Collections);
            assert_eq!(error, "HTTP 503");
        }
        other => panic!("expected failure event, got {:?}", other),
    }

    let kept = h.cache.peek_collections().unwrap();
    assert_eq!(kept[0].name, "Papers");
    assert_eq!(h.cache.fetched_at(EntityKind::Collections), fetched_at);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reaches_every_awaiter_and_clears_inflight() {
    let h = harness(
        MockDocumentApi::new()
            .with_collection(1, "Papers")
            .with_latency(Duration::from_millis(20)),
    );
    let creds = Credentials::new();
    h.api.fail_next(MockOp::ListCollections, 500);

    let (a, b) = tokio::join!(
        h.cache.collections(&creds, FetchMode::Cached),
        h.cache.collections(&creds, FetchMode::Cached),
    );
    assert_eq!(a.unwrap_err().status(), Some(500));
    assert_eq!(b.unwrap_err().status(), Some(500));
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);

    // The failed fetch no longer blocks new reads.
    let list = h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(h.api.calls(MockOp::ListCollections), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_completes_after_caller_gives_up() {
    let h = harness(
        MockDocumentApi::new()
            .with_collection(1, "Papers")
            .with_latency(Duration::from_millis(100)),
    );
    let creds = Credentials::new();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        h.cache.collections(&creds, FetchMode::Cached),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(h.cache.peek_collections().is_none());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.cache.peek_collections().unwrap().len(), 1);
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
}

#[tokio::test(start_paused = true)]
async fn test_force_during_inflight_issues_new_fetch() {
    let h = harness(
        MockDocumentApi::new()
            .with_collection(1, "Papers")
            .with_latency(Duration::from_millis(50)),
    );
    let creds = Credentials::new();

    let (a, b) = tokio::join!(
        h.cache.collections(&creds, FetchMode::Cached),
        h.cache.collections(&creds, FetchMode::Force),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(h.api.calls(MockOp::ListCollections), 2);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_survives_into_new_cache() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();
    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();

    let raw = h
        .session
        .get(EntityKind::Collections.session_key())
        .await
        .unwrap()
        .unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot["data"][0]["name"], "Papers");
    assert!(snapshot["fetchedAt"].is_i64());

    let restarted = EntityCache::with_clock(
        Arc::new(h.api.clone()),
        h.session.clone(),
        CacheConfig::default(),
        h.clock.clone(),
    );
    assert_eq!(restarted.hydrate().await, 1);

    let list = restarted
        .collections(&creds, FetchMode::Cached)
        .await
        .unwrap();
    assert_eq!(list[0].name, "Papers");
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_snapshot_is_a_miss() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    h.session
        .set(EntityKind::Collections.session_key(), "{\"data\": 12")
        .await
        .unwrap();
    h.session
        .set(
            EntityKind::Documents.session_key(),
            "{\"data\": {\"items\": []}}",
        )
        .await
        .unwrap();

    assert_eq!(h.cache.hydrate().await, 0);
    assert!(h.cache.peek_collections().is_none());

    h.cache
        .collections(&Credentials::new(), FetchMode::Cached)
        .await
        .unwrap();
    assert_eq!(h.api.calls(MockOp::ListCollections), 1);
}

#[tokio::test(start_paused = true)]
async fn test_revalidate_stale_only_touches_stale_kinds() {
    let h = harness(
        MockDocumentApi::new()
            .with_collection(1, "Papers")
            .with_document(1, "a.pdf", Some(1)),
    );
    let creds = Credentials::new().with_token("t1");

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    assert!(h.cache.revalidate_stale().is_empty());

    h.clock.advance(ChronoDuration::seconds(12));
    h.cache.documents(&creds, FetchMode::Cached).await.unwrap();

    let mut events = h.cache.subscribe();
    assert_eq!(h.cache.revalidate_stale(), vec![EntityKind::Collections]);
    assert_eq!(
        next_event(&mut events).await,
        CacheEvent::Refreshed(EntityKind::Collections)
    );
    assert_eq!(h.api.calls(MockOp::ListCollections), 2);
    assert_eq!(h.api.calls(MockOp::ListDocuments), 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_failure_is_swallowed() {
    let h = harness(MockDocumentApi::new().with_collection(1, "Papers"));
    let creds = Credentials::new();

    h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    h.clock.advance(ChronoDuration::seconds(15));
    h.api.fail_next(MockOp::ListCollections, 502);

    let mut events = h.cache.subscribe();
    let served = h.cache.collections(&creds, FetchMode::Cached).await.unwrap();
    assert_eq!(served.len(), 1);

    assert!(matches!(
        next_event(&mut events).await,
        CacheEvent::FetchFailed { .. }
    ));
    assert_eq!(h.cache.peek_collections().unwrap().len(), 1);

    // The revalidation guard is released, so a later pass runs again.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.cache.revalidate_stale(), vec![EntityKind::Collections]);
    assert_eq!(
        next_event(&mut events).await,
        CacheEvent::Refreshed(EntityKind::Collections)
    );
}
