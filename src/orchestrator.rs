//! Drives a job from a queue notification to a terminal state.
//!
//! One job per invocation; stages run strictly sequentially. The
//! idempotency guard at the top of [`Orchestrator::process`] is what makes
//! at-least-once delivery safe: a redelivered message for a running or
//! terminal job acknowledges without touching the record.

use std::sync::Arc;

use chrono::Utc;

use crate::error::PipelineError;
use crate::pipeline::job::JobStatus;
use crate::pipeline::plan::stage_sequence;
use crate::queue::JobQueue;
use crate::stage::invoker::{Stage, StageInvoker};
use crate::stage::types::StageRequest;
use crate::store::JobStore;
use crate::ui::JobProgress;

/// How a single `process` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed,
    Failed,
    /// Duplicate delivery or lost claim — the record was left untouched.
    Skipped,
}

pub struct Orchestrator<S: Stage> {
    store: Arc<dyn JobStore>,
    stages: S,
    invoker: StageInvoker,
}

impl<S: Stage> Orchestrator<S> {
    pub fn new(store: Arc<dyn JobStore>, stages: S, invoker: StageInvoker) -> Self {
        Self {
            store,
            stages,
            invoker,
        }
    }

    /// Processes one job to a terminal state.
    ///
    /// Stage results are additive, not transactional: on failure the job
    /// keeps every payload produced before the fatal stage, and no
    /// compensating rollback runs.
    pub async fn process(&self, job_id: &str) -> Result<ProcessOutcome, PipelineError> {
        let Some(mut job) = self.store.get(job_id)? else {
            return Err(PipelineError::JobNotFound(job_id.to_string()));
        };

        // Idempotency guard: only a pending job may be claimed.
        if job.status != JobStatus::Pending {
            return Ok(ProcessOutcome::Skipped);
        }

        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        if !self.store.update_if(&job, JobStatus::Pending)? {
            // Another worker won the claim between the read and the write.
            return Ok(ProcessOutcome::Skipped);
        }

        for stage in stage_sequence(&job.snapshot) {
            let request = StageRequest::new(stage, &job);
            let outcome = self.invoker.invoke(&self.stages, &request).await;
            job.stage_executions.extend(outcome.executions);

            match outcome.result {
                Ok(payload) => {
                    job.result_payloads.insert(stage, payload);
                    self.store.update_if(&job, JobStatus::Running)?;
                }
                Err(err) => {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(err.to_string());
                    self.store.update_if(&job, JobStatus::Running)?;
                    return Ok(ProcessOutcome::Failed);
                }
            }
        }

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.total_duration_seconds = Some(job.successful_stage_seconds());
        self.store.update_if(&job, JobStatus::Running)?;
        Ok(ProcessOutcome::Completed)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    pub completed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Pull-based worker: dequeues notifications and processes each job to a
/// terminal state before taking the next message.
pub struct Worker<S: Stage> {
    queue: Arc<JobQueue>,
    store: Arc<dyn JobStore>,
    orchestrator: Orchestrator<S>,
}

impl<S: Stage> Worker<S> {
    pub fn new(queue: Arc<JobQueue>, store: Arc<dyn JobStore>, orchestrator: Orchestrator<S>) -> Self {
        Self {
            queue,
            store,
            orchestrator,
        }
    }

    /// Runs until `max_messages` notifications have been consumed, or
    /// forever when unbounded. An infrastructure error on one message is
    /// reported and does not stop the loop.
    pub async fn run(&self, max_messages: Option<usize>) -> Result<WorkerStats, PipelineError> {
        let mut stats = WorkerStats::default();
        let mut consumed = 0usize;

        while max_messages.is_none_or(|limit| consumed < limit) {
            let Some(message) = self.queue.dequeue().await else {
                break;
            };
            consumed += 1;

            let progress = JobProgress::start(&message.job_id);
            match self.orchestrator.process(&message.job_id).await {
                Ok(outcome) => {
                    match outcome {
                        ProcessOutcome::Completed => stats.completed += 1,
                        ProcessOutcome::Failed => stats.failed += 1,
                        ProcessOutcome::Skipped => stats.skipped += 1,
                    }
                    if let Some(job) = self.store.get(&message.job_id)? {
                        progress.complete(&job);
                    }
                }
                Err(err) => {
                    stats.errors += 1;
                    progress.fail(&err.to_string());
                }
            }
        }

        Ok(stats)
    }
}
