//! Decomposition status.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::BackendStatus;

/// Step of an iteration that talks to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Master problem solve.
    Master,

    /// Dual subproblem solve.
    Dual,

    /// Auxiliary (Magnanti-Wong) subproblem solve.
    Auxiliary,

    /// Primal subproblem solve (reporting only).
    Primal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Master => write!(f, "master problem"),
            Stage::Dual => write!(f, "dual sub problem"),
            Stage::Auxiliary => write!(f, "aux sub problem"),
            Stage::Primal => write!(f, "primal sub problem"),
        }
    }
}

/// Status of a decomposition run.
///
/// Set by whichever step last completed or failed. Terminal statuses are
/// `Optimal`, `IterationLimit`, `TimeLimit` and `SolverError`; an aborted run
/// keeps the stage status that was current when it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Loop has not finished.
    #[default]
    Running,

    /// Bounds closed within epsilon.
    Optimal,

    /// The iteration cap was reached without convergence.
    IterationLimit,

    /// The time budget ran out.
    TimeLimit,

    /// The backend faulted.
    SolverError,

    /// Last completed step and the backend status it reported.
    Step {
        /// Which step.
        stage: Stage,
        /// Backend status of that step.
        backend: BackendStatus,
    },
}

impl Status {
    /// Status after a backend step finished.
    pub fn step(stage: Stage, backend: BackendStatus) -> Self {
        Status::Step { stage, backend }
    }

    /// Returns true if optimality was proven.
    pub fn is_optimal(&self) -> bool {
        matches!(self, Status::Optimal)
    }

    /// Returns true if the loop ended on a limit or fault rather than convergence.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            Status::TimeLimit | Status::SolverError | Status::Step { .. } | Status::Running
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running => write!(f, "running"),
            Status::Optimal => write!(f, "optimal solution"),
            Status::IterationLimit => write!(f, "iteration limit exceeded"),
            Status::TimeLimit => write!(f, "time limit exceeded"),
            Status::SolverError => write!(f, "solver error"),
            Status::Step { stage, backend } => write!(f, "{} {}", stage, backend),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
