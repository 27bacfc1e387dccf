//! The fixed stage sequence an analysis job runs through.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::PortfolioSnapshot;

/// One discrete unit of pipeline work.
///
/// Serialized in lowercase so stage names match the wire format and the
/// keys of a job's `result_payloads` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Classify,
    Report,
    Chart,
    Retirement,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Classify => "classify",
            StageKind::Report => "report",
            StageKind::Chart => "chart",
            StageKind::Retirement => "retirement",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds the stage sequence for a snapshot.
///
/// Classification only runs when at least one position is missing an asset
/// class tag; report, chart and retirement always run, in that order.
pub fn stage_sequence(snapshot: &PortfolioSnapshot) -> Vec<StageKind> {
    let mut stages = Vec::with_capacity(4);
    if snapshot.needs_classification() {
        stages.push(StageKind::Classify);
    }
    stages.extend([StageKind::Report, StageKind::Chart, StageKind::Retirement]);
    stages
}
