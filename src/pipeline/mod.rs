pub mod job;
pub mod plan;

pub use job::{
    Account, ExecutionStatus, Job, JobStatus, PortfolioSnapshot, Position, RetryConfig,
    StageExecution,
};
pub use plan::{StageKind, stage_sequence};
