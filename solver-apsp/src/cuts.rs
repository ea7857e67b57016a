//! Optimality cuts for the scheduling master.

use std::sync::Arc;

use solver_lbbd::{
    BendersCut, ConstraintSense, CutGenerator, CutSource, LbbdError, LbbdResult, LinearExpr,
    SolveOutcome, VarId,
};

use crate::rows::ScheduleRows;

/// Builds `μ >= Σ_r π[r]·rhs[r](x, y)` from dual or auxiliary multipliers.
pub struct ApspCuts {
    rows: Arc<ScheduleRows>,
    period: VarId,
}

impl ApspCuts {
    /// Cut generator for a master whose period variable is `period`.
    pub fn new(rows: Arc<ScheduleRows>, period: VarId) -> Self {
        Self { rows, period }
    }
}

impl CutGenerator for ApspCuts {
    fn generate(
        &self,
        multipliers: &SolveOutcome,
        source: CutSource,
        iteration: usize,
    ) -> LbbdResult<BendersCut> {
        if multipliers.values.len() != self.rows.len() {
            return Err(LbbdError::InvalidPoint(format!(
                "expected {} multipliers, got {}",
                self.rows.len(),
                multipliers.values.len()
            )));
        }
        let rhs = self.rows.cut_rhs(&multipliers.values);
        log::debug!(
            "cut {} ({}): {} terms, constant {}",
            iteration,
            source,
            rhs.num_terms(),
            rhs.constant_value()
        );
        Ok(BendersCut::new(
            LinearExpr::from(self.period),
            ConstraintSense::Ge,
            rhs,
            source,
            iteration,
        ))
    }
}
