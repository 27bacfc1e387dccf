//! Bounded-retry wrapper around a stage call.
//!
//! Every attempt, success or failure, produces its own execution record, so
//! a flapping stage leaves its whole retry history in the job's audit
//! trail. Retrying is an explicit bounded loop with an attempt counter —
//! termination is guaranteed by construction.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::{sleep, timeout};

use super::error::StageError;
use super::types::StageRequest;
use crate::pipeline::job::{ExecutionStatus, RetryConfig, StageExecution};

/// Anything that can execute a stage request.
///
/// Production uses an HTTP client for the hosted stages and an in-process
/// engine call for retirement; tests substitute scripted doubles.
pub trait Stage {
    async fn invoke(&self, request: &StageRequest) -> Result<Value, StageError>;
}

/// Result of one invocation: the final outcome plus the record of every
/// attempt that was made along the way.
pub struct InvokeOutcome {
    pub result: Result<Value, StageError>,
    pub executions: Vec<StageExecution>,
}

pub struct StageInvoker {
    retry: RetryConfig,
    attempt_timeout: Duration,
}

impl StageInvoker {
    pub fn new(retry: RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            retry,
            attempt_timeout,
        }
    }

    /// Calls the stage, retrying transient failures with exponential
    /// backoff up to the configured attempt budget. A hard per-attempt
    /// timeout is treated the same as any other transient stage error.
    pub async fn invoke<S: Stage>(&self, backend: &S, request: &StageRequest) -> InvokeOutcome {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut executions = Vec::new();
        let mut attempt = 1;

        loop {
            let started_at = Utc::now();
            let result = match timeout(self.attempt_timeout, backend.invoke(request)).await {
                Ok(inner) => inner,
                Err(_) => Err(StageError::Timeout),
            };
            let ended_at = Utc::now();

            executions.push(StageExecution {
                stage: request.stage,
                attempt,
                started_at,
                ended_at,
                duration_seconds: (ended_at - started_at).num_milliseconds() as f64 / 1000.0,
                status: match result {
                    Ok(_) => ExecutionStatus::Ok,
                    Err(_) => ExecutionStatus::Error,
                },
                error_message: result.as_ref().err().map(|err| err.to_string()),
            });

            match result {
                Ok(payload) => {
                    return InvokeOutcome {
                        result: Ok(payload),
                        executions,
                    };
                }
                Err(err) => {
                    if !err.is_transient() || attempt >= max_attempts {
                        return InvokeOutcome {
                            result: Err(err),
                            executions,
                        };
                    }
                    let delay_ms = self.retry.delay_for_attempt(attempt);
                    log_retry(attempt, max_attempts, &err.to_string(), delay_ms);
                    sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn log_retry(attempt: u32, max: u32, reason: &str, delay_ms: u64) {
    eprintln!("  ↻ Retry {attempt}/{max}: {reason} (waiting {delay_ms}ms)");
}
