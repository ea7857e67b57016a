//! Backend solver capability.
//!
//! The controller only needs three things from a backend: solve a model
//! under a time limit, report a distinguishable status, and (on the failure
//! path) explain why a model is infeasible.

mod microlp_backend;

use std::fmt;
use std::time::{Duration, Instant};

pub use microlp_backend::MicrolpSolver;

use crate::error::LbbdResult;
use crate::model::{BackendStatus, LinearModel, SolveOutcome};

/// Irreducible infeasible subset of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// Model that was diagnosed.
    pub model: String,

    /// Status of the full model when diagnosis started.
    pub status: BackendStatus,

    /// Names of the constraints in the conflict.
    pub constraints: Vec<String>,

    /// False if the diagnosis budget ran out before the filter finished.
    pub complete: bool,
}

impl Conflict {
    /// Returns true if a conflict was found.
    pub fn is_infeasible(&self) -> bool {
        self.status == BackendStatus::Infeasible
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_infeasible() {
            return writeln!(
                f,
                "model {} is not infeasible (status: {})",
                self.model, self.status
            );
        }
        writeln!(
            f,
            "conflict for {}: {} constraint(s){}",
            self.model,
            self.constraints.len(),
            if self.complete { "" } else { " (partial)" }
        )?;
        if self.constraints.is_empty() {
            writeln!(f, "  variable bounds alone are inconsistent")?;
        }
        for name in &self.constraints {
            writeln!(f, "  {}", name)?;
        }
        Ok(())
    }
}

/// Trait for backend solvers.
pub trait Solver {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Solve `model` within `time_limit` (None = unlimited).
    ///
    /// Infeasible, unbounded and time-limited runs are reported through the
    /// outcome status. Internal backend failures are returned as
    /// [`LbbdError::SolverFault`](crate::LbbdError::SolverFault).
    fn solve(&mut self, model: &LinearModel, time_limit: Option<Duration>)
        -> LbbdResult<SolveOutcome>;

    /// Explain why `model` is infeasible.
    ///
    /// The default runs a deletion filter on top of [`solve`](Self::solve).
    fn explain_infeasibility(
        &mut self,
        model: &LinearModel,
        time_limit: Duration,
    ) -> LbbdResult<Conflict> {
        deletion_filter(self, model, time_limit)
    }
}

/// Deletion filter: drop each constraint in turn and keep it out if the
/// remainder stays infeasible. What survives is an irreducible infeasible set
/// (unless the budget runs out first).
pub fn deletion_filter<S: Solver + ?Sized>(
    solver: &mut S,
    model: &LinearModel,
    time_limit: Duration,
) -> LbbdResult<Conflict> {
    let start = Instant::now();
    let remaining = |start: Instant| time_limit.saturating_sub(start.elapsed());

    let full = solver.solve(model, Some(remaining(start)))?;
    if full.status != BackendStatus::Infeasible {
        return Ok(Conflict {
            model: model.name().to_string(),
            status: full.status,
            constraints: Vec::new(),
            complete: true,
        });
    }

    let mut keep: Vec<usize> = (0..model.num_constraints()).collect();
    let mut complete = true;
    let mut pos = 0;
    while pos < keep.len() {
        let left = remaining(start);
        if left.is_zero() {
            complete = false;
            break;
        }
        let mut candidate = keep.clone();
        candidate.remove(pos);
        let trial = solver.solve(&model.with_constraint_subset(&candidate), Some(left))?;
        match trial.status {
            BackendStatus::Infeasible => keep = candidate,
            BackendStatus::TimeLimit => {
                complete = false;
                break;
            }
            _ => pos += 1,
        }
    }

    log::debug!(
        "conflict for {}: {} of {} constraints",
        model.name(),
        keep.len(),
        model.num_constraints()
    );

    Ok(Conflict {
        model: model.name().to_string(),
        status: BackendStatus::Infeasible,
        constraints: keep
            .iter()
            .map(|&i| model.constraints()[i].name.clone())
            .collect(),
        complete,
    })
}
