use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::debug;

use super::KeyValueStore;
use crate::error::{Result, SyncError};

/// Root directory for the on-disk store.
///
/// This is a dedicated directory that `cacache` manages internally
/// (index + content-addressed blobs).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StoreRoot(PathBuf);

impl StoreRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreRoot").field(&self.0).finish()
    }
}

/// A thin typed wrapper over `cacache`.
///
/// Reads are integrity-checked; a blob that fails the check surfaces as an
/// error and callers decide whether that means "absent".
#[derive(Clone, Debug)]
pub struct DiskStore {
    root: StoreRoot,
}

impl DiskStore {
    pub fn new(root: StoreRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &StoreRoot {
        &self.root
    }
}

#[async_trait]
impl KeyValueStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match cacache::read(self.root.as_path(), key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(cacache::Error::EntryNotFound(_, _)) => {
                debug!("store miss: {}", key);
                Ok(None)
            }
            Err(cacache::Error::IntegrityError(err)) => Err(SyncError::Store(
                format!("entry failed integrity check: {key} ({err})"),
            )),
            Err(cacache::Error::SizeMismatch(wanted, actual)) => {
                Err(SyncError::Store(format!(
                    "entry size mismatch: key={key}, wanted={wanted}, actual={actual}"
                )))
            }
            Err(err) => {
                Err(SyncError::Store(format!("cacache read failed: {err}")))
            }
        }
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        cacache::write(self.root.as_path(), key, bytes)
            .await
            .map(|_| ())
            .map_err(|e| SyncError::Store(format!("cacache write failed: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let r_opts = cacache::index::RemoveOpts::new().remove_fully(true);
        match r_opts.remove(self.root.as_path(), key).await {
            Ok(()) => Ok(()),
            Err(cacache::Error::IoError(io, _))
                if io.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(e) => {
                Err(SyncError::Store(format!("cacache remove failed: {e}")))
            }
        }
    }
}
