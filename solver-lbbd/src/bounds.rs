//! Bound tracking and incumbent snapshots.

use std::sync::Arc;

use serde::Serialize;

use crate::model::{LinearModel, ObjectiveSense, SolveOutcome};
use crate::point::TrialPoint;

/// A model together with the outcome of solving it.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    /// The model as it was solved.
    pub model: Arc<LinearModel>,

    /// Backend outcome (None if the solve never returned).
    pub outcome: Option<SolveOutcome>,
}

impl ModelSnapshot {
    /// Pair a model with its outcome.
    pub fn new(model: Arc<LinearModel>, outcome: Option<SolveOutcome>) -> Self {
        Self { model, outcome }
    }

    /// Objective of the outcome, if any.
    pub fn objective(&self) -> Option<f64> {
        self.outcome.as_ref().and_then(|o| o.objective)
    }
}

/// Best bound-and-solution snapshot.
#[derive(Debug, Clone)]
pub struct Incumbent {
    /// Iteration that produced it.
    pub iteration: usize,

    /// Bound value (the dual subproblem objective).
    pub objective: f64,

    /// Trial point the subproblems were evaluated at.
    pub trial: TrialPoint,

    /// Master model and outcome at that iteration.
    pub master: ModelSnapshot,

    /// Dual subproblem model and outcome at that iteration.
    pub dual: ModelSnapshot,
}

/// Bound values as plain data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Lower bound.
    pub lower: f64,

    /// Upper bound.
    pub upper: f64,
}

impl Bounds {
    /// `upper - lower`.
    pub fn gap(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Tracks lower/upper bounds and the incumbent.
///
/// Minimize: the master gives the lower bound and the dual subproblem gives
/// candidate upper bounds. Maximize mirrors this.
#[derive(Debug, Clone)]
pub struct BoundTracker {
    sense: ObjectiveSense,
    lower: f64,
    upper: f64,
    incumbent: Option<Incumbent>,
    update_count: u64,
}

impl BoundTracker {
    /// Create a tracker with infinite bounds.
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            sense,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            incumbent: None,
            update_count: 0,
        }
    }

    /// Fold in one iteration's master and dual objectives.
    ///
    /// Returns true if the dual-side bound strictly improved, in which case
    /// the caller should record a new incumbent.
    pub fn update(&mut self, master_objective: f64, dual_objective: f64) -> bool {
        match self.sense {
            ObjectiveSense::Minimize => {
                let before = self.upper;
                self.upper = self.upper.min(dual_objective);
                self.lower = master_objective;
                self.upper < before && self.upper == dual_objective
            }
            ObjectiveSense::Maximize => {
                let before = self.lower;
                self.lower = self.lower.max(dual_objective);
                self.upper = master_objective;
                self.lower > before && self.lower == dual_objective
            }
        }
    }

    /// Store a new incumbent.
    pub fn record(&mut self, incumbent: Incumbent) {
        self.update_count += 1;
        self.incumbent = Some(incumbent);
    }

    /// Objective sense.
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Lower bound.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Both bounds.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            lower: self.lower,
            upper: self.upper,
        }
    }

    /// Returns true if `|upper - lower| < epsilon`.
    pub fn converged(&self, epsilon: f64) -> bool {
        (self.upper - self.lower).abs() < epsilon
    }

    /// Best proven objective: upper bound when minimizing, lower when maximizing.
    pub fn objective(&self) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => self.upper,
            ObjectiveSense::Maximize => self.lower,
        }
    }

    /// Current incumbent.
    pub fn incumbent(&self) -> Option<&Incumbent> {
        self.incumbent.as_ref()
    }

    /// Number of recorded incumbents.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}
