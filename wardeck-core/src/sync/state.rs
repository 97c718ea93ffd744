use std::sync::Arc;

use chrono::{DateTime, Utc};
use wardeck_model::ScanDataset;

use crate::error::ErrorInfo;

/// Observable view of the synchronization layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    /// Dataset currently on screen, possibly stale while `loading`.
    pub data: Option<Arc<ScanDataset>>,
    pub loading: bool,
    /// Blocking error; only ever set while `data` is absent.
    pub error: Option<ErrorInfo>,
    /// Tag of the most recently started fetch.
    pub generation: u64,
    /// When the displayed data was captured. Presentation may use it as a
    /// staleness hint.
    pub captured_at: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            generation: 0,
            captured_at: None,
        }
    }
}

/// Coarse state-machine position derived from a [`SyncState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    /// A fetch is in flight. With stale data the previous report keeps
    /// rendering; without it the dashboard shows a blocking loader.
    Loading { with_stale_data: bool },
    Ready,
    ErrorNoData,
}

impl SyncState {
    pub fn phase(&self) -> SyncPhase {
        match (&self.data, self.loading, &self.error) {
            (Some(_), true, _) => SyncPhase::Loading {
                with_stale_data: true,
            },
            (Some(_), false, _) => SyncPhase::Ready,
            (None, false, Some(_)) => SyncPhase::ErrorNoData,
            (None, true, _) if self.generation > 0 => SyncPhase::Loading {
                with_stale_data: false,
            },
            (None, _, _) => SyncPhase::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == SyncPhase::Ready
    }

    /// `true` once the state no longer waits on a fetch.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase(), SyncPhase::Ready | SyncPhase::ErrorNoData)
    }
}
