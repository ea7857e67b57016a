//! Error types for the decomposition.

use thiserror::Error;

use crate::model::BackendStatus;
use crate::status::Stage;

/// Errors that can occur while building or running a decomposition.
#[derive(Error, Debug)]
pub enum LbbdError {
    /// The time budget was exhausted at a poll point.
    #[error("Timeout exceeded")]
    TimeLimit,

    /// The backend solver raised an internal error.
    #[error("Solver fault: {0}")]
    SolverFault(String),

    /// A step finished without a usable solution (no objective or multipliers).
    #[error("{stage} returned no solution (status: {status})")]
    MissingSolution {
        /// Step that produced the status.
        stage: Stage,
        /// Backend status of that step.
        status: BackendStatus,
    },

    /// Model construction failed.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// A trial or core point does not match the expected layout.
    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// An export needs an incumbent but no bound ever improved.
    #[error("No incumbent available")]
    NoIncumbent,

    /// Adapter code panicked inside the iteration loop.
    #[error("Unexpected panic: {0}")]
    Panic(String),

    /// Writing an export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an export failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a failure ends the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Remaining time reached zero.
    Timeout,

    /// The backend faulted.
    SolverFault,

    /// Anything else.
    Unclassified,
}

impl LbbdError {
    /// Classify the error for the controller's terminal status.
    pub fn reason(&self) -> FailureReason {
        match self {
            LbbdError::TimeLimit => FailureReason::Timeout,
            LbbdError::SolverFault(_) => FailureReason::SolverFault,
            _ => FailureReason::Unclassified,
        }
    }
}

/// Result type for decomposition operations.
pub type LbbdResult<T> = Result<T, LbbdError>;
