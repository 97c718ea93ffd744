use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use wardeck_model::ModelError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid scan payload: {0}")]
    Decode(#[from] ModelError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// HTTP status carried by the failure, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Presentation-safe description of a failed sync.
///
/// Cloneable so it can live inside the published state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub status: Option<u16>,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn from_error(err: &SyncError, occurred_at: DateTime<Utc>) -> Self {
        Self {
            message: err.to_string(),
            status: err.status(),
            occurred_at,
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
