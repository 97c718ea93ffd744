//! Fetch-versus-cache orchestration.
//!
//! [`SyncController`] decides whether the cached scan can be shown as is,
//! shown while a background refresh runs, or whether the dashboard has to
//! block on the network. Every transition is published as a [`SyncState`]
//! snapshot through a watch channel.

pub mod controller;
pub mod state;

pub use controller::{SyncController, SyncOptions};
pub use state::{SyncPhase, SyncState};
