//! Cache-versus-network decisions of the sync controller
//!
//! These tests drive the controller with a scripted fetcher and a manual
//! clock: fresh caches skip the network, stale caches stay on screen while
//! revalidating, failures never blank displayed data, and a superseded
//! fetch can never overwrite the result of a newer one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::json;
use tokio::sync::{Notify, oneshot};
use wardeck_core::cache::{CACHE_KEY, ScanDataCache};
use wardeck_core::fetch::ScanFetcher;
use wardeck_core::infra::store::{KeyValueStore, MemoryStore};
use wardeck_core::sync::{SyncController, SyncOptions, SyncPhase, SyncState};
use wardeck_core::time::ManualClock;
use wardeck_core::{Result, SyncError};
use wardeck_model::ScanDataset;

#[derive(Debug)]
enum Step {
    Ready(Result<ScanDataset>),
    Gated(oneshot::Receiver<Result<ScanDataset>>),
}

#[derive(Debug, Default)]
struct ScriptedFetcher {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    started: Notify,
}

impl ScriptedFetcher {
    fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    fn respond(&self, result: Result<ScanDataset>) {
        self.push(Step::Ready(result));
    }

    fn gate(&self) -> oneshot::Sender<Result<ScanDataset>> {
        let (tx, rx) = oneshot::channel();
        self.push(Step::Gated(rx));
        tx
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanFetcher for ScriptedFetcher {
    async fn fetch_scan(&self) -> Result<ScanDataset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        self.started.notify_one();
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SyncError::Transport("gate dropped".into()))),
            None => Err(SyncError::Transport("no scripted response".into())),
        }
    }
}

/// Store whose first write blocks until released.
#[derive(Debug, Default)]
struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    writing: Notify,
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let gate = self.gate.lock().unwrap().take();
        self.writing.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.inner.set(key, bytes).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

struct Harness {
    store: MemoryStore,
    clock: ManualClock,
    cache: ScanDataCache,
    fetcher: Arc<ScriptedFetcher>,
    controller: SyncController,
}

fn harness_with(options: SyncOptions) -> Harness {
    let store = MemoryStore::new();
    let clock = ManualClock::default();
    let cache = ScanDataCache::new(Arc::new(store.clone()), Arc::new(clock.clone()));
    let fetcher = Arc::new(ScriptedFetcher::default());
    let controller = SyncController::new(
        cache.clone(),
        fetcher.clone(),
        Arc::new(clock.clone()),
        options,
    );
    Harness {
        store,
        clock,
        cache,
        fetcher,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(SyncOptions::default())
}

fn dataset(users_without_mfa: &[&str]) -> ScanDataset {
    serde_json::from_value(json!({
        "security": { "users_without_mfa": users_without_mfa },
        "scan_metadata": {
            "status": "Healthy",
            "throttled_requests": 0,
            "last_scan_duration_sec": 12
        }
    }))
    .unwrap()
}

fn server_error() -> SyncError {
    SyncError::Http {
        status: 500,
        message: "Internal Server Error".into(),
    }
}

async fn cached(h: &Harness) -> Option<ScanDataset> {
    h.cache.read().await.map(|entry| (**entry.payload()).clone())
}

async fn wait_until(h: &Harness, f: impl FnMut(&SyncState) -> bool) {
    let mut rx = h.controller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("state never reached")
        .unwrap();
}

#[tokio::test]
async fn fresh_cache_is_served_without_fetching() {
    let h = harness();
    let a = dataset(&["alice"]);
    h.cache.write(Arc::new(a.clone())).await.unwrap();
    h.clock.advance(TimeDelta::minutes(30));

    h.controller.initialize().await;

    let state = h.controller.state();
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(state.phase(), SyncPhase::Ready);
    assert_eq!(*state.data.unwrap(), a);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn stale_cache_is_shown_while_revalidating() {
    let h = harness();
    let old = dataset(&["alice"]);
    let new = dataset(&["alice", "bob"]);
    h.cache.write(Arc::new(old.clone())).await.unwrap();
    h.clock.advance(TimeDelta::hours(2));

    let gate = h.fetcher.gate();
    let task = h.controller.spawn_initialize();
    h.fetcher.started.notified().await;

    let during = h.controller.state();
    assert_eq!(
        during.phase(),
        SyncPhase::Loading {
            with_stale_data: true
        }
    );
    assert_eq!(*during.data.unwrap(), old);

    gate.send(Ok(new.clone())).unwrap();
    task.await.unwrap();

    let state = h.controller.state();
    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(state.phase(), SyncPhase::Ready);
    assert_eq!(*state.data.unwrap(), new);
    assert_eq!(cached(&h).await, Some(new));
}

#[tokio::test]
async fn empty_cache_blocks_on_fetch_and_persists_result() {
    let h = harness();
    let d = dataset(&["carol"]);
    h.fetcher.respond(Ok(d.clone()));

    assert_eq!(h.controller.state().phase(), SyncPhase::Uninitialized);
    h.controller.initialize().await;

    let state = h.controller.state();
    assert_eq!(*state.data.unwrap(), d);
    assert_eq!(state.captured_at, Some(h.cache.read().await.unwrap().captured_at()));
    assert_eq!(cached(&h).await, Some(d));
}

#[tokio::test]
async fn corrupt_cache_entry_counts_as_absent() {
    let h = harness();
    h.store.set(CACHE_KEY, b"{not json").await.unwrap();
    let d = dataset(&[]);
    h.fetcher.respond(Ok(d.clone()));

    h.controller.initialize().await;

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(cached(&h).await, Some(d));
}

#[tokio::test]
async fn background_failure_keeps_stale_data_and_hides_error() {
    let h = harness();
    let old = dataset(&["alice"]);
    h.cache.write(Arc::new(old.clone())).await.unwrap();
    h.clock.advance(TimeDelta::hours(2));
    h.fetcher.respond(Err(server_error()));

    h.controller.initialize().await;

    let state = h.controller.state();
    assert_eq!(state.phase(), SyncPhase::Ready);
    assert_eq!(*state.data.unwrap(), old);
    assert!(state.error.is_none());

    let suppressed = h.controller.last_suppressed_error().unwrap();
    assert_eq!(suppressed.status, Some(500));
    assert_eq!(cached(&h).await, Some(old));
}

#[tokio::test]
async fn failure_without_data_surfaces_error() {
    let h = harness();
    h.fetcher.respond(Err(server_error()));

    h.controller.initialize().await;

    let state = h.controller.state();
    assert_eq!(state.phase(), SyncPhase::ErrorNoData);
    let error = state.error.unwrap();
    assert_eq!(error.status, Some(500));
    assert!(error.message.contains("500"));
    assert!(h.controller.last_suppressed_error().is_none());
    assert!(cached(&h).await.is_none());
}

#[tokio::test]
async fn retry_after_error_clears_it() {
    let h = harness();
    h.fetcher.respond(Err(server_error()));
    h.controller.initialize().await;
    assert!(h.controller.state().error.is_some());

    let d = dataset(&["dave"]);
    h.fetcher.respond(Ok(d.clone()));
    h.controller.refresh(false).await;

    let state = h.controller.state();
    assert!(state.error.is_none());
    assert_eq!(*state.data.unwrap(), d);
}

#[tokio::test]
async fn forced_refresh_drops_cache_and_screen_data() {
    let h = harness();
    let a = dataset(&["alice"]);
    let b = dataset(&["bob"]);
    h.cache.write(Arc::new(a)).await.unwrap();
    h.controller.initialize().await;
    assert_eq!(h.fetcher.calls(), 0);

    let gate = h.fetcher.gate();
    let task = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    let during = h.controller.state();
    assert_eq!(
        during.phase(),
        SyncPhase::Loading {
            with_stale_data: false
        }
    );
    assert!(cached(&h).await.is_none());

    gate.send(Ok(b.clone())).unwrap();
    task.await.unwrap();

    assert_eq!(*h.controller.state().data.unwrap(), b);
    assert_eq!(cached(&h).await, Some(b));
}

#[tokio::test]
async fn forced_refresh_failure_shows_error() {
    let h = harness();
    h.cache.write(Arc::new(dataset(&["alice"]))).await.unwrap();
    h.controller.initialize().await;
    h.fetcher.respond(Err(SyncError::Transport("connection refused".into())));

    h.controller.refresh(true).await;

    let state = h.controller.state();
    assert_eq!(state.phase(), SyncPhase::ErrorNoData);
    assert_eq!(state.error.unwrap().status, None);
}

#[tokio::test]
async fn newer_fetch_wins_when_older_completes_last() {
    let h = harness();
    let d1 = dataset(&["first"]);
    let d2 = dataset(&["second", "fetch"]);

    let g1 = h.fetcher.gate();
    let t1 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    let g2 = h.fetcher.gate();
    let t2 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    g2.send(Ok(d2.clone())).unwrap();
    t2.await.unwrap();
    g1.send(Ok(d1)).unwrap();
    t1.await.unwrap();

    let state = h.controller.state();
    assert_eq!(state.generation, 2);
    assert_eq!(*state.data.unwrap(), d2);
    assert_eq!(cached(&h).await, Some(d2));
}

#[tokio::test]
async fn older_fetch_completing_first_is_discarded() {
    let h = harness();
    let d1 = dataset(&["first"]);
    let d2 = dataset(&["second"]);

    let g1 = h.fetcher.gate();
    let t1 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    let g2 = h.fetcher.gate();
    let t2 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    g1.send(Ok(d1)).unwrap();
    t1.await.unwrap();

    let between = h.controller.state();
    assert!(between.loading);
    assert!(between.data.is_none());
    assert!(cached(&h).await.is_none());

    g2.send(Ok(d2.clone())).unwrap();
    t2.await.unwrap();
    assert_eq!(*h.controller.state().data.unwrap(), d2);
}

#[tokio::test]
async fn superseded_failure_does_not_set_error() {
    let h = harness();
    let d2 = dataset(&["second"]);

    let g1 = h.fetcher.gate();
    let t1 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    let g2 = h.fetcher.gate();
    let t2 = h.controller.spawn_refresh(true);
    h.fetcher.started.notified().await;

    g2.send(Ok(d2.clone())).unwrap();
    t2.await.unwrap();
    g1.send(Err(server_error())).unwrap();
    t1.await.unwrap();

    let state = h.controller.state();
    assert!(state.error.is_none());
    assert_eq!(*state.data.unwrap(), d2);
    assert!(h.controller.last_suppressed_error().is_none());
}

#[tokio::test]
async fn slow_fetch_times_out_like_a_network_error() {
    let h = harness_with(SyncOptions {
        request_timeout: Duration::from_millis(50),
        ..SyncOptions::default()
    });
    let _gate = h.fetcher.gate();

    h.controller.initialize().await;

    let state = h.controller.state();
    assert_eq!(state.phase(), SyncPhase::ErrorNoData);
    assert!(state.error.unwrap().message.contains("timed out"));
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let h = harness();
    let mut rx = h.controller.subscribe();
    let d = dataset(&["erin"]);
    let gate = h.fetcher.gate();

    let task = h.controller.spawn_initialize();
    wait_until(&h, |s| {
        s.phase()
            == SyncPhase::Loading {
                with_stale_data: false,
            }
    })
    .await;

    let settled = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.settled().await })
    };

    gate.send(Ok(d.clone())).unwrap();
    task.await.unwrap();

    assert!(rx.has_changed().unwrap());
    let latest = rx.borrow_and_update().clone();
    assert_eq!(latest.phase(), SyncPhase::Ready);

    let settled = settled.await.unwrap();
    assert_eq!(*settled.data.unwrap(), d);
}

#[tokio::test]
async fn clones_share_state() {
    let h = harness();
    h.fetcher.respond(Ok(dataset(&[])));
    let other = h.controller.clone();

    other.initialize().await;

    assert!(h.controller.state().is_ready());
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn refresh_waits_for_a_pending_cache_write() {
    let store = Arc::new(GatedStore::default());
    let (release, gate) = oneshot::channel();
    *store.gate.lock().unwrap() = Some(gate);

    let clock = ManualClock::default();
    let cache = ScanDataCache::new(store.clone(), Arc::new(clock.clone()));
    let fetcher = Arc::new(ScriptedFetcher::default());
    let controller = SyncController::new(
        cache.clone(),
        fetcher.clone(),
        Arc::new(clock),
        SyncOptions::default(),
    );

    let d1 = dataset(&["alice"]);
    fetcher.respond(Ok(d1.clone()));
    fetcher.respond(Err(server_error()));

    let first = controller.spawn_initialize();
    store.writing.notified().await;

    let second = controller.spawn_refresh(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.state().generation, 1);

    release.send(()).unwrap();
    first.await.unwrap();
    second.await.unwrap();

    let state = controller.state();
    assert_eq!(fetcher.calls(), 1);
    assert!(state.error.is_none());
    assert_eq!(*state.data.unwrap(), d1);
    assert_eq!(
        cache.read().await.map(|entry| (**entry.payload()).clone()),
        Some(d1)
    );
}
