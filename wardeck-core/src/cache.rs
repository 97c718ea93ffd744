//! Local persisted copy of the last successful scan.
//!
//! `ScanDataCache` is the only component that touches the persistent store.
//! It holds at most one entry, written wholesale and never patched in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wardeck_model::ScanDataset;

use crate::error::Result;
use crate::infra::store::KeyValueStore;
use crate::time::Clock;

/// Store key of the cached scan. Bump the version segment whenever the
/// on-disk layout of [`CacheEntry`] changes.
pub const CACHE_KEY: &str = "wardeck/scan/v1";

/// How long a cached scan is trusted without revalidation.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// A scan payload together with the moment it was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    captured_at: DateTime<Utc>,
    payload: Arc<ScanDataset>,
}

impl CacheEntry {
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn payload(&self) -> &Arc<ScanDataset> {
        &self.payload
    }
}

#[derive(Serialize)]
struct StoredEntryRef<'a> {
    captured_at: DateTime<Utc>,
    payload: &'a ScanDataset,
}

#[derive(Deserialize)]
struct StoredEntry {
    captured_at: DateTime<Utc>,
    payload: ScanDataset,
}

#[derive(Clone, Debug)]
pub struct ScanDataCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ScanDataCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Last written entry.
    ///
    /// A store failure or an undecodable blob reads as "no entry"; the
    /// dashboard would rather refetch than show an error for a bad cache.
    pub async fn read(&self) -> Option<CacheEntry> {
        let bytes = match self.store.get(CACHE_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("scan cache miss");
                return None;
            }
            Err(err) => {
                warn!("scan cache unreadable, treating as empty: {}", err);
                return None;
            }
        };

        match serde_json::from_slice::<StoredEntry>(&bytes) {
            Ok(stored) => {
                debug!("scan cache hit (captured_at={})", stored.captured_at);
                Some(CacheEntry {
                    captured_at: stored.captured_at,
                    payload: Arc::new(stored.payload),
                })
            }
            Err(err) => {
                warn!("scan cache entry corrupt, treating as empty: {}", err);
                None
            }
        }
    }

    /// Persist `payload` stamped with the current time, replacing any prior
    /// entry.
    pub async fn write(&self, payload: Arc<ScanDataset>) -> Result<CacheEntry> {
        let captured_at = self.clock.now();
        let bytes = serde_json::to_vec(&StoredEntryRef {
            captured_at,
            payload: &payload,
        })?;
        self.store.set(CACHE_KEY, &bytes).await?;
        debug!("scan cache written ({} bytes)", bytes.len());

        Ok(CacheEntry {
            captured_at,
            payload,
        })
    }

    pub async fn invalidate(&self) -> Result<()> {
        debug!("scan cache invalidated");
        self.store.remove(CACHE_KEY).await
    }

    /// Age of `entry` relative to the cache clock.
    pub fn age(&self, entry: &CacheEntry) -> TimeDelta {
        self.clock.now() - entry.captured_at
    }

    /// `true` while the entry is strictly younger than `ttl`. An entry whose
    /// age equals the TTL is already stale.
    pub fn is_fresh(&self, entry: &CacheEntry, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        self.age(entry) < ttl
    }
}
