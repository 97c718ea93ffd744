use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Outcome reported by the scanner for the API calls it made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanStatus {
    Healthy,
    Throttled,
    /// Any status the scanner reports that this model does not know about.
    Other(String),
}

impl ScanStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ScanStatus::Healthy)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScanStatus::Healthy => "Healthy",
            ScanStatus::Throttled => "Throttled",
            ScanStatus::Other(raw) => raw,
        }
    }
}

impl Default for ScanStatus {
    fn default() -> Self {
        ScanStatus::Other(String::new())
    }
}

impl From<String> for ScanStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Healthy" => ScanStatus::Healthy,
            "Throttled" => ScanStatus::Throttled,
            _ => ScanStatus::Other(raw),
        }
    }
}

impl From<ScanStatus> for String {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan bookkeeping attached to every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanMetadata {
    pub status: ScanStatus,
    pub throttled_requests: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_requests: Option<u64>,
    #[serde(rename = "last_scan_duration_sec")]
    pub scan_duration_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let meta: ScanMetadata = serde_json::from_str(
            r#"{"status":"Degraded","throttled_requests":2,"last_scan_duration_sec":41}"#,
        )
        .unwrap();
        assert_eq!(meta.status, ScanStatus::Other("Degraded".into()));
        assert_eq!(meta.scan_duration_secs, 41);
        assert_eq!(meta.successful_requests, None);

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["status"], "Degraded");
    }

    #[test]
    fn healthy_status_round_trips_as_string() {
        let meta: ScanMetadata =
            serde_json::from_str(r#"{"status":"Healthy"}"#).unwrap();
        assert!(meta.status.is_healthy());
        assert_eq!(meta.throttled_requests, 0);
    }
}
