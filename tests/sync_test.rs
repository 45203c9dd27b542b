//! Tests for the sync lifecycle: load, push/poll updates and teardown

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lead_dashboard::models::{ChangeEvent, ChangeKind, RawRecord};
use lead_dashboard::source::{ChangeFeed, ChannelFeed, FeedSubscription, JsonFileSource, LeadSource};
use lead_dashboard::sync::{FeedStatus, LeadSync, SyncOptions, SyncStrategy};
use lead_dashboard::{LeadError, LoadState};
use serde_json::{json, Value};

fn raw(value: Value) -> RawRecord {
    value.as_object().cloned().expect("test rows are objects")
}

/// Returns queued responses in order, repeating the last one
struct ScriptedSource {
    responses: Mutex<VecDeque<Vec<RawRecord>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Vec<RawRecord>>) -> Self {
        Self { responses: Mutex::new(responses.into()) }
    }
}

#[async_trait]
impl LeadSource for ScriptedSource {
    async fn fetch_all(&self) -> lead_dashboard::Result<Vec<RawRecord>> {
        let mut responses = self.responses.lock().expect("lock");
        if responses.len() > 1 {
            Ok(responses.pop_front().unwrap_or_default())
        } else {
            Ok(responses.front().cloned().unwrap_or_default())
        }
    }
}

struct StalledSource;

#[async_trait]
impl LeadSource for StalledSource {
    async fn fetch_all(&self) -> lead_dashboard::Result<Vec<RawRecord>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Hands out subscriptions whose sender is already gone
struct EndedFeed;

#[async_trait]
impl ChangeFeed for EndedFeed {
    async fn subscribe(&self, _table: &str) -> lead_dashboard::Result<FeedSubscription> {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(tx);
        Ok(FeedSubscription::new(rx))
    }
}

fn options() -> SyncOptions {
    SyncOptions { table: "Retell_Leads".into(), fetch_timeout: Duration::from_secs(5) }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_fetch_times_out_into_failed_state() {
    let sync = LeadSync::create(Arc::new(StalledSource), SyncStrategy::Static, options());

    let result = sync.load_all().await;

    assert!(matches!(result, Err(LeadError::FetchTimeout(5))));
    assert!(matches!(sync.state().load, LoadState::Failed(_)));
}

#[tokio::test]
async fn test_missing_snapshot_file_is_fetch_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = JsonFileSource::new(dir.path().join("missing.json"));
    let sync = LeadSync::create(Arc::new(source), SyncStrategy::Static, options());

    let error = sync.load_all().await.expect_err("missing file must fail");
    assert!(error.is_fetch_failure());
    assert!(sync.state().leads.is_empty());
}

#[tokio::test]
async fn test_snapshot_file_source_loads_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("leads.json");
    std::fs::write(&path, r#"[{"id": 1, "tentativas": "2"}, {"id": 2}, "not a row"]"#).expect("write");

    let sync = LeadSync::create(Arc::new(JsonFileSource::new(&path)), SyncStrategy::Static, options());
    assert_eq!(sync.load_all().await.expect("load"), 2);
}

#[tokio::test]
async fn test_push_events_are_applied_in_order() {
    let (feed, publisher) = ChannelFeed::new(16);
    let source = ScriptedSource::new(vec![vec![raw(json!({"id": 1}))]]);
    let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Push(Arc::new(feed)), options());

    sync.load_all().await.expect("load");
    assert_eq!(sync.subscribe().await, FeedStatus::Subscribed);
    let mut updates = sync.watch();
    let loaded_revision = updates.borrow_and_update().revision;

    publisher.publish(ChangeEvent::new(ChangeKind::Insert, raw(json!({"id": 2})))).await.expect("publish");
    publisher.publish(ChangeEvent::new(ChangeKind::Update, raw(json!({"id": 1, "atendido": "Sim"})))).await.expect("publish");
    publisher
        .publish(ChangeEvent { kind: ChangeKind::Delete, record: RawRecord::new(), old: Some(raw(json!({"id": 2}))) })
        .await
        .expect("publish");

    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            updates.changed().await.expect("sender alive");
            let state = updates.borrow_and_update().clone();
            if state.revision >= loaded_revision + 3 {
                return state;
            }
        }
    })
    .await
    .expect("changes applied");

    assert_eq!(state.leads.len(), 1);
    assert!(state.leads[0].was_answered);
    sync.dispose().await;
    assert_eq!(sync.state().feed, FeedStatus::Closed);
    assert!(publisher.is_closed());
}

#[tokio::test]
async fn test_failed_subscription_falls_back_to_static_snapshot() {
    let (feed, _publisher) = ChannelFeed::new(4);
    let feed = Arc::new(feed);
    // Take the only receiver so the dashboard's subscribe fails
    let _taken = lead_dashboard::source::ChangeFeed::subscribe(feed.as_ref(), "Retell_Leads").await.expect("first");

    let source = ScriptedSource::new(vec![vec![raw(json!({"id": 1}))]]);
    let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Push(feed), options());
    sync.load_all().await.expect("load");

    let status = sync.subscribe().await;
    assert!(matches!(status, FeedStatus::Failed(_)));
    assert_eq!(sync.state().leads.len(), 1);
    assert_eq!(sync.state().load, LoadState::Ready);
}

#[tokio::test]
async fn test_closed_feed_is_observable() {
    let (feed, publisher) = ChannelFeed::new(4);
    let source = ScriptedSource::new(vec![Vec::new()]);
    let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Push(Arc::new(feed)), options());
    sync.load_all().await.expect("load");
    sync.subscribe().await;

    let mut updates = sync.watch();
    drop(publisher);

    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|state| matches!(state.feed, FeedStatus::Failed(_))))
        .await
        .expect("feed end observed")
        .expect("sender alive");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_feed_that_ends_at_once_is_never_reported_subscribed() {
    for _ in 0..50 {
        let source = ScriptedSource::new(vec![Vec::new()]);
        let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Push(Arc::new(EndedFeed)), options());
        sync.load_all().await.expect("load");
        sync.subscribe().await;

        let mut updates = sync.watch();
        tokio::time::timeout(
            Duration::from_secs(5),
            updates.wait_for(|state| matches!(state.feed, FeedStatus::Failed(_))),
        )
        .await
        .expect("feed end observed")
        .expect("sender alive");

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(sync.state().feed, FeedStatus::Failed(_)));
        assert!(!sync.state().feed.is_live());
    }
}

#[tokio::test(start_paused = true)]
async fn test_poll_strategy_diffs_refetches() {
    let source = ScriptedSource::new(vec![
        vec![raw(json!({"id": 1})), raw(json!({"id": 2}))],
        vec![raw(json!({"id": 3})), raw(json!({"id": 1, "tentativas": 5}))],
    ]);
    let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Poll(Duration::from_secs(30)), options());

    sync.load_all().await.expect("load");
    assert_eq!(sync.subscribe().await, FeedStatus::Polling);

    let mut updates = sync.watch();
    let state = tokio::time::timeout(
        Duration::from_secs(120),
        updates.wait_for(|state| state.leads.iter().any(|lead| lead.id == 3)),
    )
    .await
    .expect("poll applied")
    .expect("sender alive")
    .clone();

    let ids: Vec<_> = state.leads.iter().map(|lead| lead.id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert_eq!(state.leads[1].attempts, 5);

    sync.dispose().await;
    assert_eq!(sync.state().feed, FeedStatus::Closed);
}

#[tokio::test]
async fn test_subscribe_twice_is_noop() {
    let source = ScriptedSource::new(vec![Vec::new()]);
    let mut sync = LeadSync::create(Arc::new(source), SyncStrategy::Poll(Duration::from_secs(60)), options());
    assert_eq!(sync.subscribe().await, FeedStatus::Polling);
    assert_eq!(sync.subscribe().await, FeedStatus::Polling);
    assert!(sync.state().feed.is_live());
    sync.dispose().await;
    assert!(!sync.state().feed.is_live());
}
