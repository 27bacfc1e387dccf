//! Simulation inputs and outputs.
//!
//! A [`RetirementScenario`] is validated before any simulation work begins;
//! invalid parameters surface as a [`ScenarioError`], never as a runtime
//! numeric error inside the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable input to the retirement projection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementScenario {
    pub initial_balance: f64,
    pub years_to_retirement: u32,
    /// First-year withdrawal; later years compound by `inflation_rate`.
    pub annual_withdrawal: f64,
    pub inflation_rate: f64,
    pub return_mean: f64,
    pub return_stdev: f64,
    pub num_trajectories: u32,
    /// Fixed seed for bit-reproducible results. `None` draws fresh entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("years_to_retirement must be at least 1")]
    ZeroHorizon,

    #[error("num_trajectories must be at least 1")]
    ZeroTrajectories,

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} must not be negative")]
    Negative(&'static str),

    #[error("bootstrap return model requires at least one sample")]
    EmptyBootstrap,
}

impl RetirementScenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.years_to_retirement == 0 {
            return Err(ScenarioError::ZeroHorizon);
        }
        if self.num_trajectories == 0 {
            return Err(ScenarioError::ZeroTrajectories);
        }

        let fields = [
            ("initial_balance", self.initial_balance),
            ("annual_withdrawal", self.annual_withdrawal),
            ("inflation_rate", self.inflation_rate),
            ("return_mean", self.return_mean),
            ("return_stdev", self.return_stdev),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ScenarioError::NotFinite(name));
            }
        }

        if self.initial_balance < 0.0 {
            return Err(ScenarioError::Negative("initial_balance"));
        }
        if self.annual_withdrawal < 0.0 {
            return Err(ScenarioError::Negative("annual_withdrawal"));
        }
        if self.return_stdev < 0.0 {
            return Err(ScenarioError::Negative("return_stdev"));
        }

        Ok(())
    }
}

/// Final-balance percentiles across all trajectories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

/// Aggregate outcome of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Percentage of trajectories that survive the full horizon, in [0, 100].
    pub success_rate: f64,
    /// Median final balance (`percentiles.p50`).
    pub projected_value: f64,
    pub percentiles: Percentiles,
    pub num_trajectories: u32,
}
