//! # Wardeck Core
//!
//! Data layer of the Wardeck cloud-audit dashboard: keeps the last scan
//! report in a local cache, decides when to refetch it from the scanning
//! backend, and turns a report into per-pillar scores.
//!
//! - [`cache`]: persisted copy of the last successful scan with a TTL
//! - [`sync`]: the controller that arbitrates between cache and network
//! - [`scoring`]: finding counts and 1..=5 pillar scores
//! - [`summary`]: dashboard projections built on top of the scores
//! - [`config`]: file and environment driven settings
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wardeck_core::{
//!     cache::ScanDataCache,
//!     fetch::HttpScanFetcher,
//!     infra::store::{DiskStore, StoreRoot},
//!     sync::SyncController,
//!     time::SystemClock,
//!     config::SyncConfig,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = SyncConfig::default();
//! let clock = Arc::new(SystemClock);
//! let store = Arc::new(DiskStore::new(StoreRoot::new(config.cache_dir.clone())));
//! let cache = ScanDataCache::new(store, clock.clone());
//! let fetcher = Arc::new(HttpScanFetcher::new(
//!     config.endpoint_url()?,
//!     config.request_timeout,
//! )?);
//!
//! let controller = SyncController::new(cache, fetcher, clock, config.sync_options());
//! controller.initialize().await;
//! if let Some(data) = controller.state().data {
//!     for pillar in wardeck_core::scoring::score_all_pillars(&data) {
//!         println!("{}: {}", pillar.pillar, pillar.score);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod scoring;
pub mod summary;
pub mod sync;
pub mod time;

pub use error::{ErrorInfo, Result, SyncError};

pub use wardeck_model as model;
