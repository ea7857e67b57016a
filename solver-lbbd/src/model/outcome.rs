//! Solve outcomes reported by a backend.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::linear::VarId;

/// Status reported by a backend solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendStatus {
    /// Proven optimal solution.
    Optimal,

    /// Time limit reached; a solution may or may not be available.
    TimeLimit,

    /// Model is infeasible.
    Infeasible,

    /// Objective is unbounded.
    Unbounded,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Optimal => write!(f, "optimal"),
            BackendStatus::TimeLimit => write!(f, "time limit"),
            BackendStatus::Infeasible => write!(f, "infeasible"),
            BackendStatus::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl Serialize for BackendStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of solving one model.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Backend status.
    pub status: BackendStatus,

    /// Objective value, if a solution is available.
    pub objective: Option<f64>,

    /// Variable values indexed by [`VarId`] (empty without a solution).
    pub values: Vec<f64>,

    /// Wall-clock time spent in the backend.
    pub solve_time: Duration,
}

impl SolveOutcome {
    /// Outcome carrying a solution.
    pub fn solved(status: BackendStatus, objective: f64, values: Vec<f64>) -> Self {
        Self {
            status,
            objective: Some(objective),
            values,
            solve_time: Duration::ZERO,
        }
    }

    /// Outcome without a solution.
    pub fn without_solution(status: BackendStatus) -> Self {
        Self {
            status,
            objective: None,
            values: Vec::new(),
            solve_time: Duration::ZERO,
        }
    }

    /// Set the recorded solve time.
    pub fn with_solve_time(mut self, solve_time: Duration) -> Self {
        self.solve_time = solve_time;
        self
    }

    /// Returns true if a solution is available.
    pub fn has_solution(&self) -> bool {
        self.objective.is_some()
    }

    /// Value of `var`, if a solution is available.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }
}
