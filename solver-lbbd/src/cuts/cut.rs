//! Benders optimality cuts.

use std::fmt;

use crate::error::{LbbdError, LbbdResult};
use crate::model::{ConstraintSense, LinearExpr, LinearModel};

/// Which subproblem supplied the multipliers of a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutSource {
    /// Stabilized multipliers from the auxiliary (Magnanti-Wong) subproblem.
    MagnantiWong,

    /// Plain dual subproblem multipliers.
    Dual,
}

impl fmt::Display for CutSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutSource::MagnantiWong => write!(f, "magnanti-wong"),
            CutSource::Dual => write!(f, "dual"),
        }
    }
}

/// A linear cut `expr (sense) rhs` over master variables.
#[derive(Debug, Clone)]
pub struct BendersCut {
    /// Variable terms (no constant part).
    pub expr: LinearExpr,

    /// Row sense.
    pub sense: ConstraintSense,

    /// Right-hand side.
    pub rhs: f64,

    /// Source of the multipliers.
    pub source: CutSource,

    /// Iteration whose multipliers produced the cut.
    pub iteration: usize,
}

impl BendersCut {
    /// Create `lhs (sense) rhs`, moving all constants to the right.
    pub fn new(
        lhs: LinearExpr,
        sense: ConstraintSense,
        rhs: LinearExpr,
        source: CutSource,
        iteration: usize,
    ) -> Self {
        let mut expr = lhs - rhs;
        let rhs = -expr.constant_value();
        expr.add_constant(rhs);
        expr.prune(0.0);
        Self {
            expr,
            sense,
            rhs,
            source,
            iteration,
        }
    }

    /// Constraint name used in the master.
    pub fn name(&self) -> String {
        format!("benders_cut_{}", self.iteration)
    }

    /// Amount by which `values` violate the cut (positive means violated).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            ConstraintSense::Le => lhs - self.rhs,
            ConstraintSense::Ge => self.rhs - lhs,
            ConstraintSense::Eq => (lhs - self.rhs).abs(),
        }
    }

    /// Check if the cut is violated by more than tolerance.
    pub fn is_violated(&self, values: &[f64], tol: f64) -> bool {
        self.violation(values) > tol
    }

    /// Check if the cut has a nonzero, finite coefficient row.
    pub fn is_valid(&self) -> bool {
        let has_nonzero = self.expr.terms().any(|(_, c)| c.abs() > 1e-12);
        has_nonzero && self.expr.is_finite() && self.rhs.is_finite()
    }

    /// Append the cut to `model`, returning the constraint index.
    pub fn add_to(&self, model: &mut LinearModel) -> LbbdResult<usize> {
        if !self.is_valid() {
            return Err(LbbdError::InvalidModel(format!(
                "{} has no usable coefficients",
                self.name()
            )));
        }
        model.add_constraint(self.name(), self.expr.clone(), self.sense, self.rhs)
    }
}
