//! Persistent key-value store capability: three operations on opaque bytes,
//! backed by `cacache` on disk or a map in memory.

pub mod disk;
pub mod memory;

pub use disk::{DiskStore, StoreRoot};
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Bytes stored under `key`, `None` when nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value.
    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Drop whatever is stored under `key`. Removing a missing key is not an
    /// error.
    async fn remove(&self, key: &str) -> Result<()>;
}
