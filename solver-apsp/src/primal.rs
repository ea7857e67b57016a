//! Primal subproblem: start times and period for a fixed allocation.

use std::sync::Arc;

use solver_lbbd::{
    ConstraintSense, LbbdResult, LinearExpr, LinearModel, ObjectiveSense,
    SolverConfig, SubproblemAdapter, SubproblemInput, VarId,
};

use crate::instance::ApspInstance;
use crate::rows::{check_point, ScheduleRows};

/// `min μ` over start times `s >= 0` with every schedule row at the trial point.
pub struct ApspPrimal {
    instance: Arc<ApspInstance>,
    rows: Arc<ScheduleRows>,
    config: SolverConfig,
}

impl ApspPrimal {
    /// Primal subproblem over the shared row table.
    pub fn new(instance: Arc<ApspInstance>, rows: Arc<ScheduleRows>, config: SolverConfig) -> Self {
        Self {
            instance,
            rows,
            config,
        }
    }

    /// Id of the start time of `task` in built models.
    pub fn start(task: usize) -> VarId {
        VarId::new(task)
    }

    /// Id of the period in built models.
    pub fn period(&self) -> VarId {
        VarId::new(self.rows.num_tasks())
    }
}

impl SubproblemAdapter for ApspPrimal {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn sense(&self) -> ObjectiveSense {
        ObjectiveSense::Minimize
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()> {
        for task in self.instance.tasks() {
            model.add_continuous(format!("s_{}", task.name), 0.0, f64::INFINITY);
        }
        model.add_continuous("mu", 0.0, f64::INFINITY);
        Ok(())
    }

    fn declare_constraints(
        &self,
        model: &mut LinearModel,
        input: &SubproblemInput<'_>,
    ) -> LbbdResult<()> {
        let point = input.trial.discrete();
        check_point("trial point", point, self.rows.num_discrete())?;
        let mu = self.period();
        for row in self.rows.rows() {
            let mut lhs = LinearExpr::term(mu, row.period);
            for &(task, coef) in &row.starts {
                lhs.add_term(Self::start(task), coef);
            }
            model.add_constraint(
                row.name.as_str(),
                lhs,
                ConstraintSense::Ge,
                row.rhs.evaluate(point),
            )?;
        }
        model.set_objective(LinearExpr::from(mu))
    }
}
