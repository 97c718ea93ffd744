use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::findings::Finding;
use crate::metadata::ScanMetadata;
use crate::pillar::Pillar;

/// Findings reported for one check inside a pillar.
///
/// Most checks report a sequence of findings. A few report a single status
/// object instead (Compute Optimizer enrollment, for example). Any value that
/// is not a sequence, `null` included, counts as one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindingCategory {
    Findings(Vec<Finding>),
    Status(Value),
}

impl FindingCategory {
    pub fn record_count(&self) -> usize {
        match self {
            FindingCategory::Findings(findings) => findings.len(),
            FindingCategory::Status(_) => 1,
        }
    }

    /// Finding records of a sequence category; empty for status objects.
    pub fn findings(&self) -> &[Finding] {
        match self {
            FindingCategory::Findings(findings) => findings,
            FindingCategory::Status(_) => &[],
        }
    }

    pub fn status(&self) -> Option<&Value> {
        match self {
            FindingCategory::Status(value) => Some(value),
            FindingCategory::Findings(_) => None,
        }
    }
}

impl From<Vec<Finding>> for FindingCategory {
    fn from(findings: Vec<Finding>) -> Self {
        FindingCategory::Findings(findings)
    }
}

/// Mapping from check name to the findings it produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillarSection(BTreeMap<String, FindingCategory>);

impl PillarSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with_category(
        mut self,
        name: impl Into<String>,
        category: impl Into<FindingCategory>,
    ) -> Self {
        self.insert(name, category);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        category: impl Into<FindingCategory>,
    ) -> Option<FindingCategory> {
        self.0.insert(name.into(), category.into())
    }

    pub fn category(&self, name: &str) -> Option<&FindingCategory> {
        self.0.get(name)
    }

    pub fn categories(
        &self,
    ) -> impl Iterator<Item = (&str, &FindingCategory)> + '_ {
        self.0.iter().map(|(name, category)| (name.as_str(), category))
    }

    /// Findings of one check, empty when the check is missing.
    pub fn findings(&self, name: &str) -> &[Finding] {
        self.category(name)
            .map(FindingCategory::findings)
            .unwrap_or_default()
    }

    /// Total records across every check in the section.
    pub fn record_count(&self) -> usize {
        self.0.values().map(FindingCategory::record_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the records of one check into a typed view. Records that do
    /// not match the expected shape are skipped.
    pub fn typed<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        self.findings(name)
            .iter()
            .filter_map(Finding::decode)
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, FindingCategory)> for PillarSection {
    fn from_iter<I: IntoIterator<Item = (K, FindingCategory)>>(
        iter: I,
    ) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A complete audit report as returned by the scanning endpoint.
///
/// Sections that are missing or not JSON objects decode as `None` so that a
/// single malformed pillar never rejects the whole report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanDataset {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub security: Option<PillarSection>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost_optimization: Option<PillarSection>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub reliability: Option<PillarSection>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub performance_efficiency: Option<PillarSection>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub operational_excellence: Option<PillarSection>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub scan_metadata: Option<ScanMetadata>,
}

impl ScanDataset {
    /// Decode a report body. The body must be a JSON object; anything else
    /// is not a report.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(ModelError::InvalidPayload(
                "expected a JSON object at the top level".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn section(&self, pillar: Pillar) -> Option<&PillarSection> {
        match pillar {
            Pillar::Security => self.security.as_ref(),
            Pillar::Cost => self.cost_optimization.as_ref(),
            Pillar::Reliability => self.reliability.as_ref(),
            Pillar::Performance => self.performance_efficiency.as_ref(),
            Pillar::Operations => self.operational_excellence.as_ref(),
        }
    }

    pub fn set_section(&mut self, pillar: Pillar, section: PillarSection) {
        let slot = match pillar {
            Pillar::Security => &mut self.security,
            Pillar::Cost => &mut self.cost_optimization,
            Pillar::Reliability => &mut self.reliability,
            Pillar::Performance => &mut self.performance_efficiency,
            Pillar::Operations => &mut self.operational_excellence,
        };
        *slot = Some(section);
    }

    pub fn with_section(mut self, pillar: Pillar, section: PillarSection) -> Self {
        self.set_section(pillar, section);
        self
    }

    pub fn with_metadata(mut self, metadata: ScanMetadata) -> Self {
        self.scan_metadata = Some(metadata);
        self
    }
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
