use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wardeck_model::ScanDataset;

use super::state::SyncState;
use crate::cache::{DEFAULT_CACHE_TTL, ScanDataCache};
use crate::error::{ErrorInfo, SyncError};
use crate::fetch::ScanFetcher;
use crate::time::Clock;

/// Default upper bound for a single scan fetch.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Age below which a cached scan is served without refetching.
    pub cache_ttl: Duration,
    /// Fetches that take longer fail exactly like a network error.
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

struct Inner {
    cache: ScanDataCache,
    fetcher: Arc<dyn ScanFetcher>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
    state: watch::Sender<SyncState>,
    /// Guards generation bumps, the cache read that decides them, and every
    /// store mutation. A completion that passes the generation check under
    /// it stays current until its write and state update are done.
    cache_writes: AsyncMutex<()>,
    suppressed_error: Mutex<Option<ErrorInfo>>,
}

/// Owns [`SyncState`] and decides between cache and network.
///
/// Cloning is cheap; clones drive the same state. Fetches are tagged with a
/// generation number and a completion only touches state or cache while its
/// generation is still the latest one started.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SyncController")
            .field("generation", &state.generation)
            .field("loading", &state.loading)
            .field("has_data", &state.data.is_some())
            .field("has_error", &state.error.is_some())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl SyncController {
    pub fn new(
        cache: ScanDataCache,
        fetcher: Arc<dyn ScanFetcher>,
        clock: Arc<dyn Clock>,
        options: SyncOptions,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());

        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                clock,
                options,
                state,
                cache_writes: AsyncMutex::new(()),
                suppressed_error: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    /// Most recent background-refresh failure that was kept off screen
    /// because cached data was already displayed.
    pub fn last_suppressed_error(&self) -> Option<ErrorInfo> {
        self.inner
            .suppressed_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Resolves once no fetch is pending, returning the settled state.
    pub async fn settled(&self) -> SyncState {
        let mut rx = self.subscribe();
        match rx.wait_for(SyncState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Startup decision between cache and network.
    ///
    /// A fresh cached scan is shown without touching the network. A stale
    /// one is shown immediately while a refetch runs. Without a cached scan
    /// the dashboard blocks on the fetch. Returns once any fetch it started
    /// has completed.
    pub async fn initialize(&self) {
        let generation = {
            let _guard = self.inner.cache_writes.lock().await;
            self.start_from_cache().await
        };

        if let Some(generation) = generation {
            self.run_fetch(generation).await;
        }
    }

    /// Applies the cache decision and returns the generation of the fetch it
    /// started, if any. Caller holds `cache_writes`.
    async fn start_from_cache(&self) -> Option<u64> {
        let ttl = self.inner.options.cache_ttl;

        match self.inner.cache.read().await {
            None => {
                info!("no cached scan, fetching");
                Some(self.begin_fetch(|state| {
                    state.data = None;
                    state.captured_at = None;
                }))
            }
            Some(entry) if self.inner.cache.is_fresh(&entry, ttl) => {
                info!(
                    "serving cached scan captured at {}",
                    entry.captured_at()
                );
                self.inner.state.send_modify(|state| {
                    state.data = Some(Arc::clone(entry.payload()));
                    state.captured_at = Some(entry.captured_at());
                    state.loading = false;
                    state.error = None;
                });
                None
            }
            Some(entry) => {
                info!(
                    "cached scan is stale (age {}s), revalidating",
                    self.inner.cache.age(&entry).num_seconds()
                );
                Some(self.begin_fetch(|state| {
                    state.data = Some(Arc::clone(entry.payload()));
                    state.captured_at = Some(entry.captured_at());
                    state.error = None;
                }))
            }
        }
    }

    /// User-triggered refresh. `force` drops the cached scan and the data on
    /// screen before fetching; otherwise this re-runs the startup decision.
    pub async fn refresh(&self, force: bool) {
        if !force {
            self.initialize().await;
            return;
        }

        info!("forced refresh requested");
        let generation = {
            let _guard = self.inner.cache_writes.lock().await;
            let generation = self.begin_fetch(|state| {
                state.data = None;
                state.captured_at = None;
                state.error = None;
            });
            if let Err(err) = self.inner.cache.invalidate().await {
                warn!("failed to invalidate scan cache: {}", err);
            }
            generation
        };

        self.run_fetch(generation).await;
    }

    /// [`initialize`](Self::initialize) on a background task.
    pub fn spawn_initialize(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.initialize().await })
    }

    /// [`refresh`](Self::refresh) on a background task.
    pub fn spawn_refresh(&self, force: bool) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.refresh(force).await })
    }

    /// Caller holds `cache_writes`.
    fn begin_fetch(&self, prepare: impl FnOnce(&mut SyncState)) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.loading = true;
            prepare(state);
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.borrow().generation == generation
    }

    async fn run_fetch(&self, generation: u64) {
        let timeout = self.inner.options.request_timeout;
        debug!(generation, "scan fetch started");

        let outcome = match tokio::time::timeout(
            timeout,
            self.inner.fetcher.fetch_scan(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(timeout)),
        };

        match outcome {
            Ok(dataset) => self.complete_success(generation, dataset).await,
            Err(err) => self.complete_failure(generation, err),
        }
    }

    async fn complete_success(&self, generation: u64, dataset: ScanDataset) {
        let payload = Arc::new(dataset);
        let _guard = self.inner.cache_writes.lock().await;

        if !self.is_current(generation) {
            debug!(generation, "discarding superseded scan response");
            return;
        }

        let captured_at = match self.inner.cache.write(Arc::clone(&payload)).await
        {
            Ok(entry) => entry.captured_at(),
            Err(err) => {
                warn!("failed to persist scan: {}", err);
                self.inner.clock.now()
            }
        };

        let applied = self.inner.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.data = Some(payload);
            state.captured_at = Some(captured_at);
            state.loading = false;
            state.error = None;
            true
        });

        if applied {
            debug!(generation, "scan fetch applied");
        } else {
            debug!(generation, "scan response superseded while persisting");
        }
    }

    fn complete_failure(&self, generation: u64, err: SyncError) {
        let info = ErrorInfo::from_error(&err, self.inner.clock.now());
        let mut suppressed = false;

        let applied = self.inner.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.loading = false;
            if state.data.is_none() {
                state.error = Some(info.clone());
            } else {
                suppressed = true;
            }
            true
        });

        if !applied {
            debug!(generation, "discarding superseded scan failure: {}", err);
        } else if suppressed {
            warn!(
                "background refresh failed, keeping cached scan on screen: {}",
                err
            );
            *self
                .inner
                .suppressed_error
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(info);
        } else {
            warn!("scan fetch failed: {}", err);
        }
    }
}
