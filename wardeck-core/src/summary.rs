//! Dashboard-level projections of a scan report.

use wardeck_model::{
    ComputeOptimizerStatus, Pillar, RdsInstance, ScanDataset, ScanMetadata,
    ScanStatus, TrailStatus,
};

use crate::scoring::{PillarScore, score_all_pillars};

pub const HEALTHY_ADVISORY: &str = "All API requests were successful.";
pub const THROTTLED_ADVISORY: &str =
    "Some API requests were throttled. Data may be incomplete.";

/// Counts behind the security breakdown chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityBreakdown {
    pub users_without_mfa: usize,
    pub public_buckets: usize,
    pub aged_access_keys: usize,
    pub open_security_groups: usize,
}

impl SecurityBreakdown {
    pub fn from_dataset(dataset: &ScanDataset) -> Self {
        let Some(security) = dataset.section(Pillar::Security) else {
            return Self::default();
        };
        Self {
            users_without_mfa: security.findings("users_without_mfa").len(),
            public_buckets: security.findings("public_s3_buckets").len(),
            aged_access_keys: security.findings("aged_iam_keys").len(),
            open_security_groups: security
                .findings("unrestricted_security_groups")
                .len(),
        }
    }

    /// Labelled slices in chart order.
    pub fn slices(&self) -> [(&'static str, usize); 4] {
        [
            ("Users without MFA", self.users_without_mfa),
            ("Public S3 Buckets", self.public_buckets),
            ("Aged IAM Keys", self.aged_access_keys),
            ("Open Security Groups", self.open_security_groups),
        ]
    }
}

/// How the scan itself went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHealth {
    pub status: ScanStatus,
    pub duration_secs: u64,
    pub throttled_requests: u64,
}

impl ScanHealth {
    pub fn from_metadata(metadata: &ScanMetadata) -> Self {
        Self {
            status: metadata.status.clone(),
            duration_secs: metadata.scan_duration_secs,
            throttled_requests: metadata.throttled_requests,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    pub fn advisory(&self) -> &'static str {
        if self.is_healthy() {
            HEALTHY_ADVISORY
        } else {
            THROTTLED_ADVISORY
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub pillars: [PillarScore; 5],
    pub security: SecurityBreakdown,
    /// Absent when the report carried no scan metadata.
    pub health: Option<ScanHealth>,
}

impl DashboardSummary {
    pub fn from_dataset(dataset: &ScanDataset) -> Self {
        Self {
            pillars: score_all_pillars(dataset),
            security: SecurityBreakdown::from_dataset(dataset),
            health: dataset.scan_metadata.as_ref().map(ScanHealth::from_metadata),
        }
    }

    pub fn total_findings(&self) -> usize {
        self.pillars.iter().map(|p| p.findings).sum()
    }

    pub fn pillar(&self, pillar: Pillar) -> &PillarScore {
        // pillars is built from Pillar::ALL, so the index always exists
        &self.pillars[pillar as usize]
    }
}

/// Trails that exist but are not logging.
pub fn trails_not_logging(dataset: &ScanDataset) -> Vec<TrailStatus> {
    dataset
        .section(Pillar::Security)
        .map(|s| s.typed::<TrailStatus>("cloudtrail_status"))
        .unwrap_or_default()
        .into_iter()
        .filter(|trail| !trail.is_logging)
        .collect()
}

/// RDS instances without a Multi-AZ standby.
pub fn single_az_databases(dataset: &ScanDataset) -> Vec<RdsInstance> {
    dataset
        .section(Pillar::Reliability)
        .map(|s| s.typed::<RdsInstance>("rds_multi_az_status"))
        .unwrap_or_default()
        .into_iter()
        .filter(|db| !db.is_multi_az)
        .collect()
}

pub fn compute_optimizer(dataset: &ScanDataset) -> ComputeOptimizerStatus {
    ComputeOptimizerStatus::from_category(
        dataset
            .section(Pillar::Cost)
            .and_then(|s| s.category("compute_optimizer_status")),
    )
}

/// Checks that failed on the scanner side, as `(pillar, check, message)`.
pub fn failed_checks(dataset: &ScanDataset) -> Vec<(Pillar, String, String)> {
    Pillar::ALL
        .into_iter()
        .filter_map(|pillar| dataset.section(pillar).map(|s| (pillar, s)))
        .flat_map(|(pillar, section)| {
            section.categories().filter_map(move |(name, category)| {
                category
                    .error_message()
                    .map(|msg| (pillar, name.to_string(), msg.to_string()))
            })
        })
        .collect()
}
