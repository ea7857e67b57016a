//! Optimality cuts for the throughput master.

use std::sync::Arc;

use solver_lbbd::{
    BendersCut, ConstraintSense, CutGenerator, CutSource, LbbdError, LbbdResult, LinearExpr,
    SolveOutcome, VarId,
};

use crate::throughput::rows::ThroughputRows;

/// Builds `z <= Σ_r π[r]·rhs[r](m, K)` from dual or auxiliary multipliers.
pub struct ThroughputCuts {
    rows: Arc<ThroughputRows>,
    throughput: VarId,
}

impl ThroughputCuts {
    /// Cut generator for a master whose throughput variable is `throughput`.
    pub fn new(rows: Arc<ThroughputRows>, throughput: VarId) -> Self {
        Self { rows, throughput }
    }
}

impl CutGenerator for ThroughputCuts {
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
            "throughput cut {} ({}): {} terms, constant {}",
            iteration,
            source,
            rhs.num_terms(),
            rhs.constant_value()
        );
        Ok(BendersCut::new(
            LinearExpr::from(self.throughput),
            ConstraintSense::Le,
            rhs,
            source,
            iteration,
        ))
    }
}
