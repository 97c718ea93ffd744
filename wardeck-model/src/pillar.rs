use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One of the five audit pillars of a scan report.
///
/// The declaration order is the display order used by every summary view;
/// chart axes rely on it staying stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Security,
    #[serde(rename = "cost_optimization")]
    Cost,
    Reliability,
    #[serde(rename = "performance_efficiency")]
    Performance,
    #[serde(rename = "operational_excellence")]
    Operations,
}

impl Pillar {
    /// All pillars in display order.
    pub const ALL: [Pillar; 5] = [
        Pillar::Security,
        Pillar::Cost,
        Pillar::Reliability,
        Pillar::Performance,
        Pillar::Operations,
    ];

    /// Key of the pillar section in the scan payload.
    pub const fn key(self) -> &'static str {
        match self {
            Pillar::Security => "security",
            Pillar::Cost => "cost_optimization",
            Pillar::Reliability => "reliability",
            Pillar::Performance => "performance_efficiency",
            Pillar::Operations => "operational_excellence",
        }
    }

    /// Short axis label.
    pub const fn label(self) -> &'static str {
        match self {
            Pillar::Security => "Security",
            Pillar::Cost => "Cost",
            Pillar::Reliability => "Reliability",
            Pillar::Performance => "Performance",
            Pillar::Operations => "Operations",
        }
    }
}

impl Display for Pillar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Pillar {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pillar::ALL
            .into_iter()
            .find(|p| {
                p.key().eq_ignore_ascii_case(s)
                    || p.label().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| {
                ModelError::InvalidPayload(format!("unknown pillar: {s}"))
            })
    }
}
