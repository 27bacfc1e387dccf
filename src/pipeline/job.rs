//! The durable job record and its building blocks.
//!
//! A [`Job`] is the single shared artifact of the pipeline: created by the
//! API layer in `pending`, mutated only by the orchestrator, and read by
//! everything else. Status moves monotonically through
//! `pending → running → completed | failed`; once terminal the record never
//! changes again (the store enforces this with check-then-write).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::plan::StageKind;
use crate::retirement::scenario::RetirementScenario;

/// Lifecycle status of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a single stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Ok,
    Error,
}

/// Audit record for one stage attempt, including retries.
///
/// Appended to the job immediately after the attempt finishes and never
/// mutated afterward, so flapping stages leave a full trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageExecution {
    pub stage: StageKind,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A single holding inside an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub positions: Vec<Position>,
}

/// Read-only input referenced by a job. Never mutated during processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub accounts: Vec<Account>,
}

impl PortfolioSnapshot {
    /// True when any position still lacks an asset class tag, in which case
    /// the classify stage is prepended to the pipeline.
    pub fn needs_classification(&self) -> bool {
        self.accounts
            .iter()
            .flat_map(|account| &account.positions)
            .any(|position| position.asset_class.is_none())
    }
}

/// Retry behavior for a single stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per stage, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Backoff before the attempt following `attempt`:
    /// `base_delay_ms * 2^(attempt - 1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms * 2u64.pow(attempt.saturating_sub(1))
    }
}

/// Durable record of one analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub snapshot: PortfolioSnapshot,
    pub scenario: RetirementScenario,
    pub stage_executions: Vec<StageExecution>,
    pub result_payloads: BTreeMap<StageKind, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_seconds: Option<f64>,
}

impl Job {
    pub fn new(snapshot: PortfolioSnapshot, scenario: RetirementScenario) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            snapshot,
            scenario,
            stage_executions: Vec::new(),
            result_payloads: BTreeMap::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            total_duration_seconds: None,
        }
    }

    /// Sum of successful stage durations. Queue wait and orchestrator
    /// overhead between stages are not part of this figure.
    pub fn successful_stage_seconds(&self) -> f64 {
        self.stage_executions
            .iter()
            .filter(|execution| execution.status == ExecutionStatus::Ok)
            .map(|execution| execution.duration_seconds)
            .sum()
    }
}
