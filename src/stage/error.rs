//! Stage failure taxonomy.
//!
//! The invoker retries transient failures with bounded backoff; terminal
//! failures fail the stage (and therefore the job) on the first occurrence.

use thiserror::Error;

use crate::retirement::scenario::ScenarioError;

#[derive(Debug, Error)]
pub enum StageError {
    /// The per-attempt deadline elapsed. Retryable.
    #[error("stage request timed out")]
    Timeout,

    /// DNS, refused connection, reset mid-body. Retryable.
    #[error("connection failure: {0}")]
    Connection(String),

    /// The downstream service answered but cannot serve right now
    /// (429 or 5xx). Retryable.
    #[error("stage dependency unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The downstream service rejected the payload as invalid. Not
    /// retryable: the same input would be rejected again.
    #[error("stage rejected payload: {0}")]
    Rejected(String),

    /// The response arrived but was not the agreed shape.
    #[error("failed to parse stage response: {0}")]
    Parse(String),

    /// Simulation parameters failed validation before any work began.
    #[error("invalid simulation scenario: {0}")]
    Scenario(#[from] ScenarioError),

    /// The in-process stage task itself fell over.
    #[error("stage task failed: {0}")]
    Internal(String),
}

impl StageError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StageError::Timeout | StageError::Connection(_) | StageError::Unavailable { .. }
        )
    }
}

impl From<reqwest::Error> for StageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StageError::Timeout
        } else {
            StageError::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StageError::Timeout.is_transient());
        assert!(StageError::Connection("reset".into()).is_transient());
        assert!(
            StageError::Unavailable {
                status: 503,
                message: "overloaded".into()
            }
            .is_transient()
        );

        assert!(!StageError::Rejected("bad payload".into()).is_transient());
        assert!(!StageError::Parse("truncated".into()).is_transient());
        assert!(!StageError::Scenario(ScenarioError::ZeroHorizon).is_transient());
        assert!(!StageError::Internal("panicked".into()).is_transient());
    }

    #[test]
    fn display_messages() {
        let err = StageError::Unavailable {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(
            err.to_string(),
            "stage dependency unavailable (status 503): maintenance"
        );

        let err = StageError::Scenario(ScenarioError::ZeroTrajectories);
        assert_eq!(
            err.to_string(),
            "invalid simulation scenario: num_trajectories must be at least 1"
        );
    }
}
