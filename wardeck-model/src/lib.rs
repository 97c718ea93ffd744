//! Core data model definitions for the wardeck audit payload.
#![allow(missing_docs)]

pub mod dataset;
pub mod error;
pub mod findings;
pub mod metadata;
pub mod pillar;

// Intentionally curated re-exports for downstream consumers.
pub use dataset::{FindingCategory, PillarSection, ScanDataset};
pub use error::{ModelError, Result as ModelResult};
pub use findings::{
    AgedAccessKey, ComputeOptimizerStatus, DriftedStack, Finding,
    InstanceWithoutMonitoring, OpenSecurityGroup, PortRange, PublicBucket,
    RdsInstance, RightsizingRecommendation, TrailStatus, UnattachedVolume,
    UnprotectedVolume,
};
pub use metadata::{ScanMetadata, ScanStatus};
pub use pillar::Pillar;
