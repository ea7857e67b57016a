//! Dual and auxiliary (Magnanti-Wong) subproblems.
//!
//! Both live over one multiplier `π[r] >= 0` per schedule row. Dual
//! feasibility has one row for the period column and one per start-time
//! column of the primal subproblem.

use std::sync::Arc;

use solver_lbbd::{
    ConstraintSense, LbbdError, LbbdResult, LinearExpr, LinearModel, ObjectiveSense,
    SolverConfig, SubproblemAdapter, SubproblemInput, VarId,
};

use crate::instance::ApspInstance;
use crate::rows::{check_point, ScheduleRows};

fn declare_multipliers(rows: &ScheduleRows, model: &mut LinearModel) {
    for row in rows.rows() {
        model.add_continuous(format!("pi_{}", row.name), 0.0, f64::INFINITY);
    }
}

fn declare_feasibility(
    instance: &ApspInstance,
    rows: &ScheduleRows,
    model: &mut LinearModel,
) -> LbbdResult<()> {
    let mut period = LinearExpr::new();
    let mut starts = vec![LinearExpr::new(); rows.num_tasks()];
    for (r, row) in rows.rows().iter().enumerate() {
        let pi = VarId::new(r);
        period.add_term(pi, row.period);
        for &(task, coef) in &row.starts {
            starts[task].add_term(pi, coef);
        }
    }

    model.add_constraint("period", period, ConstraintSense::Le, 1.0)?;
    for (task, expr) in instance.tasks().iter().zip(starts) {
        model.add_constraint(format!("start_{}", task.name), expr, ConstraintSense::Le, 0.0)?;
    }
    Ok(())
}

/// `max Σ π·rhs(x̄, ȳ)` subject to dual feasibility.
pub struct ApspDual {
    instance: Arc<ApspInstance>,
    rows: Arc<ScheduleRows>,
    config: SolverConfig,
}

impl ApspDual {
    /// Dual subproblem over the shared row table.
    pub fn new(instance: Arc<ApspInstance>, rows: Arc<ScheduleRows>, config: SolverConfig) -> Self {
        Self {
            instance,
            rows,
            config,
        }
    }
}

impl SubproblemAdapter for ApspDual {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn sense(&self) -> ObjectiveSense {
        ObjectiveSense::Maximize
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()> {
        declare_multipliers(&self.rows, model);
        Ok(())
    }

    fn declare_constraints(
        &self,
        model: &mut LinearModel,
        input: &SubproblemInput<'_>,
    ) -> LbbdResult<()> {
        let point = input.trial.discrete();
        check_point("trial point", point, self.rows.num_discrete())?;
        declare_feasibility(&self.instance, &self.rows, model)?;
        model.set_objective(self.rows.dual_objective(point))
    }
}

/// Among optimal dual solutions at the trial point, the one that is best at
/// the core point.
pub struct ApspAuxiliary {
    instance: Arc<ApspInstance>,
    rows: Arc<ScheduleRows>,
    config: SolverConfig,
    optimality_tol: f64,
}

impl ApspAuxiliary {
    /// Auxiliary subproblem with relative slack `optimality_tol` on the optimality row.
    pub fn new(
        instance: Arc<ApspInstance>,
        rows: Arc<ScheduleRows>,
        config: SolverConfig,
        optimality_tol: f64,
    ) -> Self {
        Self {
            instance,
            rows,
            config,
            optimality_tol,
        }
    }
}

impl SubproblemAdapter for ApspAuxiliary {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn sense(&self) -> ObjectiveSense {
        ObjectiveSense::Maximize
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()> {
        declare_multipliers(&self.rows, model);
        Ok(())
    }

    fn declare_constraints(
        &self,
        model: &mut LinearModel,
        input: &SubproblemInput<'_>,
    ) -> LbbdResult<()> {
        let (Some(core), Some(dual_objective)) = (input.core, input.dual_objective) else {
            return Err(LbbdError::InvalidPoint(
                "auxiliary subproblem needs a core point and a dual objective".into(),
            ));
        };
        let trial = input.trial.discrete();
        check_point("trial point", trial, self.rows.num_discrete())?;
        check_point("core point", core.values(), self.rows.num_discrete())?;

        declare_feasibility(&self.instance, &self.rows, model)?;

        let slack = self.optimality_tol * dual_objective.abs().max(1.0);
        model.add_constraint(
            "optimality",
            self.rows.dual_objective(trial),
            ConstraintSense::Ge,
            dual_objective - slack,
        )?;
        model.set_objective(self.rows.dual_objective(core.values()))
    }
}
