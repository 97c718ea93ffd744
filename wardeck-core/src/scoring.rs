//! Per-pillar severity scores for the overview chart.
//!
//! Scores are a coarse bucketing of finding counts: a pillar with fewer than
//! five findings rates 5, and every further five findings costs one point,
//! down to a floor of 1. Nothing here is cached; callers recompute from the
//! dataset they are displaying.

use wardeck_model::{Pillar, PillarSection, ScanDataset};

/// Best possible score.
pub const MAX_SCORE: u8 = 5;
/// A pillar is never rated below this.
pub const MIN_SCORE: u8 = 1;
/// Findings that cost one point.
pub const FINDINGS_PER_POINT: usize = 5;

/// Total finding records across every check of a section. A missing section
/// counts as zero.
pub fn count_findings(section: Option<&PillarSection>) -> usize {
    section.map_or(0, PillarSection::record_count)
}

/// Bucketed score in `[MIN_SCORE, MAX_SCORE]`.
pub fn score(finding_count: usize) -> u8 {
    let penalty = finding_count / FINDINGS_PER_POINT;
    let remaining = usize::from(MAX_SCORE).saturating_sub(penalty);
    // remaining <= MAX_SCORE here, so the narrowing cannot truncate
    (remaining as u8).clamp(MIN_SCORE, MAX_SCORE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PillarScore {
    pub pillar: Pillar,
    pub findings: usize,
    pub score: u8,
}

/// Scores for all five pillars in display order
/// (Security, Cost, Reliability, Performance, Operations).
pub fn score_all_pillars(dataset: &ScanDataset) -> [PillarScore; 5] {
    Pillar::ALL.map(|pillar| {
        let findings = count_findings(dataset.section(pillar));
        PillarScore {
            pillar,
            findings,
            score: score(findings),
        }
    })
}
