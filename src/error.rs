use thiserror::Error;

use crate::store::StoreError;

/// Top-level pipeline failure.
///
/// Stage and simulation errors do not appear here: a stage failure becomes
/// job state (`status = failed` plus `error_message`), never a process
/// error, so the worker keeps draining its queue.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
