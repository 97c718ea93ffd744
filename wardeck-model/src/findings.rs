//! Finding records and typed views over the well-known checks.
//!
//! The scanner emits records with PascalCase field names (mirroring the cloud
//! provider's API). The typed views below keep those names on the wire and
//! expose snake_case fields to Rust callers.

use std::fmt::{self, Display, Formatter};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset::FindingCategory;

/// One detected issue within a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    /// Plain identifier, such as a user name or a VPC id.
    Identifier(String),
    /// Structured record with named fields.
    Record(Map<String, Value>),
    /// Anything else the scanner chose to emit.
    Other(Value),
}

impl Finding {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Finding::Identifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Finding::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Decode this finding into a typed view, `None` when the shape does not
    /// match.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = match self {
            Finding::Identifier(id) => Value::String(id.clone()),
            Finding::Record(fields) => Value::Object(fields.clone()),
            Finding::Other(value) => value.clone(),
        };
        serde_json::from_value(value).ok()
    }
}

impl From<&str> for Finding {
    fn from(id: &str) -> Self {
        Finding::Identifier(id.to_string())
    }
}

impl From<Value> for Finding {
    fn from(value: Value) -> Self {
        match value {
            Value::String(id) => Finding::Identifier(id),
            Value::Object(fields) => Finding::Record(fields),
            other => Finding::Other(other),
        }
    }
}

impl FindingCategory {
    /// Message of a check that failed on the scanner side. Failed checks
    /// report `{"error": "..."}` in place of their findings.
    pub fn error_message(&self) -> Option<&str> {
        self.status()?.get("error")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBucket {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Reason", default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgedAccessKey {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "CreateDate", default)]
    pub created: Option<String>,
}

/// Port of an ingress rule; the scanner reports `"All"` when the rule has no
/// port bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRange {
    Port(i64),
    Label(String),
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PortRange::Port(port) => write!(f, "{port}"),
            PortRange::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSecurityGroup {
    #[serde(rename = "GroupName")]
    pub group_name: String,
    #[serde(rename = "GroupId")]
    pub group_id: String,
    #[serde(rename = "PortRange")]
    pub port_range: PortRange,
    #[serde(rename = "Protocol", default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailStatus {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IsLogging")]
    pub is_logging: bool,
    #[serde(rename = "IsMultiRegion", default)]
    pub is_multi_region: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdsInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    pub identifier: String,
    #[serde(rename = "Engine")]
    pub engine: String,
    #[serde(rename = "IsMultiAZ")]
    pub is_multi_az: bool,
}

/// In-use volume whose latest snapshot is missing or too old.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprotectedVolume {
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
    #[serde(rename = "SizeGiB")]
    pub size_gib: u64,
    #[serde(rename = "LastSnapshot", default)]
    pub last_snapshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnattachedVolume {
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
    #[serde(rename = "SizeGiB")]
    pub size_gib: u64,
    #[serde(rename = "CreateTime", default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceWithoutMonitoring {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftedStack {
    #[serde(rename = "StackName")]
    pub stack_name: String,
    #[serde(rename = "DriftStatus")]
    pub drift_status: String,
    #[serde(rename = "DetectionStatusReason", default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsizingRecommendation {
    #[serde(rename = "instanceArn")]
    pub instance_arn: String,
    pub current_instance_type: String,
    pub recommended_instance_type: String,
}

/// Compute Optimizer enrollment as reported by the cost pillar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeOptimizerStatus {
    Enabled(Vec<RightsizingRecommendation>),
    NotEnabled { reason: String },
    Unknown,
}

impl ComputeOptimizerStatus {
    pub fn from_category(category: Option<&FindingCategory>) -> Self {
        let Some(category) = category else {
            return ComputeOptimizerStatus::Unknown;
        };
        if let Some(reason) = category.error_message() {
            return ComputeOptimizerStatus::NotEnabled {
                reason: reason.to_string(),
            };
        }
        match category {
            FindingCategory::Findings(findings) => ComputeOptimizerStatus::Enabled(
                findings.iter().filter_map(Finding::decode).collect(),
            ),
            FindingCategory::Status(Value::Null) => ComputeOptimizerStatus::Unknown,
            FindingCategory::Status(_) => ComputeOptimizerStatus::Enabled(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ComputeOptimizerStatus::Enabled(_))
    }

    /// `true` only when the scanner reported an error for the check. A
    /// missing or `null` status is not evidence of a disabled service.
    pub fn is_disabled(&self) -> bool {
        matches!(self, ComputeOptimizerStatus::NotEnabled { .. })
    }
}
