//! Stage backends and the retry wrapper around them.

pub mod client;
pub mod error;
pub mod invoker;
pub mod types;

pub use client::HttpStageClient;
pub use error::StageError;
pub use invoker::{InvokeOutcome, Stage, StageInvoker};
pub use types::{StageRequest, StageResponse};

use serde_json::{Value, json};

use crate::pipeline::plan::StageKind;
use crate::retirement::engine;
use crate::retirement::scenario::RetirementScenario;

/// Production backend: classify, report and chart are hosted services
/// reached over HTTP; retirement runs in-process on the engine.
pub struct PipelineStages {
    http: HttpStageClient,
}

impl PipelineStages {
    pub fn new(http: HttpStageClient) -> Self {
        Self { http }
    }
}

impl Stage for PipelineStages {
    async fn invoke(&self, request: &StageRequest) -> Result<Value, StageError> {
        match request.stage {
            StageKind::Retirement => run_retirement(&request.scenario).await,
            _ => self.http.invoke(request).await,
        }
    }
}

/// Deterministic in-process backend used by the demo command. Produces
/// canned classify/report/chart payloads; retirement runs the real engine.
pub struct StubStages;

impl Stage for StubStages {
    async fn invoke(&self, request: &StageRequest) -> Result<Value, StageError> {
        match request.stage {
            StageKind::Classify => {
                let assignments: Vec<Value> = request
                    .snapshot
                    .accounts
                    .iter()
                    .flat_map(|account| &account.positions)
                    .filter(|position| position.asset_class.is_none())
                    .map(|position| json!({"symbol": position.symbol, "asset_class": "equity"}))
                    .collect();
                Ok(json!({ "assignments": assignments }))
            }
            StageKind::Report => {
                let positions: usize = request
                    .snapshot
                    .accounts
                    .iter()
                    .map(|account| account.positions.len())
                    .sum();
                Ok(json!({
                    "summary": format!(
                        "{} accounts, {} positions reviewed",
                        request.snapshot.accounts.len(),
                        positions
                    )
                }))
            }
            StageKind::Chart => Ok(json!({
                "kind": "allocation_pie",
                "based_on_report": request.upstream.contains_key(&StageKind::Report),
            })),
            StageKind::Retirement => run_retirement(&request.scenario).await,
        }
    }
}

/// Runs the Monte Carlo engine off the async runtime's worker threads.
/// Scenario validation happens before any simulation work is queued.
async fn run_retirement(scenario: &RetirementScenario) -> Result<Value, StageError> {
    scenario.validate()?;
    let scenario = scenario.clone();
    let result = tokio::task::spawn_blocking(move || engine::run(&scenario))
        .await
        .map_err(|err| StageError::Internal(err.to_string()))??;
    serde_json::to_value(&result).map_err(|err| StageError::Internal(err.to_string()))
}
