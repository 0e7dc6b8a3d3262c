//! Operational errors surfaced by the engine and the orchestrator.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors aborting a sign, delta or patch invocation.
///
/// The engine is transparent: nothing is retried or wrapped, and partial
/// state is discarded on the first error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("patch plan out of order at offset {offset}")]
    OutOfOrderPlan { offset: u64 },

    #[error("block request returned {actual} bytes, expected {expected}")]
    PlanUnderrun { expected: u64, actual: u64 },

    #[error("the target file is more recent than the source file")]
    TargetNewer,
}

pub type SyncResult<T> = Result<T, SyncError>;
