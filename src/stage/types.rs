//! Wire types shared by every stage.
//!
//! All stages satisfy the same request/response contract, which is what
//! keeps the orchestrator agnostic to stage internals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::job::{Job, PortfolioSnapshot};
use crate::pipeline::plan::StageKind;
use crate::retirement::scenario::RetirementScenario;

/// Uniform input handed to a stage.
///
/// Carries the snapshot, the retirement scenario and every upstream stage's
/// result payload, so a stage can build on its predecessors (the chart
/// stage reads the report's output, for example).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRequest {
    pub job_id: String,
    pub stage: StageKind,
    pub snapshot: PortfolioSnapshot,
    pub scenario: RetirementScenario,
    #[serde(default)]
    pub upstream: BTreeMap<StageKind, Value>,
}

impl StageRequest {
    pub fn new(stage: StageKind, job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            stage,
            snapshot: job.snapshot.clone(),
            scenario: job.scenario.clone(),
            upstream: job.result_payloads.clone(),
        }
    }
}

/// Uniform stage reply: `{ok, payload?, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
