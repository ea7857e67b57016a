//! Primal, dual and auxiliary throughput subproblems.

use std::sync::Arc;

use solver_lbbd::{
    ConstraintSense, LbbdError, LbbdResult, LinearExpr, LinearModel, ObjectiveSense,
    SolverConfig, SubproblemAdapter, SubproblemInput, VarId,
};

use crate::instance::ApspInstance;
use crate::rows::check_point;
use crate::throughput::rows::ThroughputRows;

/// `max τ` over normalized start times and shares at the trial point.
pub struct ThroughputPrimal {
    instance: Arc<ApspInstance>,
    rows: Arc<ThroughputRows>,
    config: SolverConfig,
}

impl ThroughputPrimal {
    /// Primal subproblem over the shared row table.
    pub fn new(instance: Arc<ApspInstance>, rows: Arc<ThroughputRows>, config: SolverConfig) -> Self {
        Self {
            instance,
            rows,
            config,
        }
    }

    /// Id of the normalized start time of `task` in built models.
    pub fn start(task: usize) -> VarId {
        VarId::new(task)
    }

    /// Id of the throughput in built models.
    pub fn throughput(&self) -> VarId {
        VarId::new(self.rows.num_tasks())
    }

    fn share(&self, column: usize) -> VarId {
        VarId::new(self.rows.num_tasks() + 1 + column)
    }
}

impl SubproblemAdapter for ThroughputPrimal {
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
        let tasks = self.instance.tasks();
        for task in tasks {
            model.add_continuous(format!("u_{}", task.name), 0.0, f64::INFINITY);
        }
        model.add_continuous("tau", 0.0, f64::INFINITY);
        for task in tasks {
            for (r, _) in &task.options {
                model.add_continuous(
                    format!("y_{}_{}", task.name, self.instance.resources()[*r]),
                    0.0,
                    f64::INFINITY,
                );
            }
        }
        Ok(())
    }

    fn declare_constraints(
        &self,
        model: &mut LinearModel,
        input: &SubproblemInput<'_>,
    ) -> LbbdResult<()> {
        let point = input.trial.discrete();
        check_point("trial point", point, self.rows.num_discrete())?;

        for row in self.rows.rows() {
            let mut lhs = LinearExpr::new();
            if row.rate != 0.0 {
                lhs.add_term(self.throughput(), row.rate);
            }
            for &(task, coef) in &row.starts {
                lhs.add_term(Self::start(task), coef);
            }
            for &(column, coef) in &row.shares {
                lhs.add_term(self.share(column), coef);
            }
            let sense = if row.equality {
                ConstraintSense::Eq
            } else {
                ConstraintSense::Le
            };
            model.add_constraint(row.name.clone(), lhs, sense, row.rhs.evaluate(point))?;
        }
        model.set_objective(LinearExpr::from(self.throughput()))
    }
}

fn declare_multipliers(rows: &ThroughputRows, model: &mut LinearModel) {
    for row in rows.rows() {
        let lower = if row.equality { f64::NEG_INFINITY } else { 0.0 };
        model.add_continuous(format!("pi_{}", row.name), lower, f64::INFINITY);
    }
}

/// One row per primal column: `τ` (objective coefficient 1), then starts and shares.
fn declare_feasibility(
    instance: &ApspInstance,
    rows: &ThroughputRows,
    model: &mut LinearModel,
) -> LbbdResult<()> {
    let mut rate = LinearExpr::new();
    let mut starts = vec![LinearExpr::new(); rows.num_tasks()];
    let mut shares = vec![LinearExpr::new(); rows.num_shares()];
    for (r, row) in rows.rows().iter().enumerate() {
        let pi = VarId::new(r);
        if row.rate != 0.0 {
            rate.add_term(pi, row.rate);
        }
        for &(task, coef) in &row.starts {
            starts[task].add_term(pi, coef);
        }
        for &(column, coef) in &row.shares {
            shares[column].add_term(pi, coef);
        }
    }

    model.add_constraint("rate", rate, ConstraintSense::Ge, 1.0)?;
    for (task, expr) in instance.tasks().iter().zip(starts) {
        model.add_constraint(format!("start_{}", task.name), expr, ConstraintSense::Ge, 0.0)?;
    }
    for (column, expr) in shares.into_iter().enumerate() {
        model.add_constraint(format!("share_{}", column), expr, ConstraintSense::Ge, 0.0)?;
    }
    Ok(())
}

/// `min Σ π·rhs(m̄, K̄)` subject to dual feasibility.
pub struct ThroughputDual {
    instance: Arc<ApspInstance>,
    rows: Arc<ThroughputRows>,
    config: SolverConfig,
}

impl ThroughputDual {
    /// Dual subproblem over the shared row table.
    pub fn new(instance: Arc<ApspInstance>, rows: Arc<ThroughputRows>, config: SolverConfig) -> Self {
        Self {
            instance,
            rows,
            config,
        }
    }
}

impl SubproblemAdapter for ThroughputDual {
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

/// Among optimal dual solutions at the trial point, the one that is lowest at
/// the core point.
pub struct ThroughputAuxiliary {
    instance: Arc<ApspInstance>,
    rows: Arc<ThroughputRows>,
    config: SolverConfig,
    optimality_tol: f64,
}

impl ThroughputAuxiliary {
    /// Auxiliary subproblem with relative slack `optimality_tol` on the optimality row.
    pub fn new(
        instance: Arc<ApspInstance>,
        rows: Arc<ThroughputRows>,
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

impl SubproblemAdapter for ThroughputAuxiliary {
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
            ConstraintSense::Le,
            dual_objective + slack,
        )?;
        model.set_objective(self.rows.dual_objective(core.values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throughput::layout::ThroughputLayout;
    use solver_lbbd::{BackendStatus, CorePoint, MicrolpSolver, Solver, TrialPoint};

    struct Pair {
        inst: Arc<ApspInstance>,
        layout: ThroughputLayout,
        rows: Arc<ThroughputRows>,
    }

    /// a (3) then b (2) on one resource, b feeds the next iteration of a.
    fn pair() -> Pair {
        let inst = Arc::new(
            ApspInstance::from_json_str(
                r#"{"resources": ["r0"],
                    "tasks": [{"name": "a", "durations": {"r0": 3}},
                              {"name": "b", "durations": {"r0": 2}}],
                    "dependencies": [{"from": "a", "to": "b", "tokens": 0},
                                     {"from": "b", "to": "a", "tokens": 1}]}"#,
            )
            .unwrap(),
        );
        let layout = ThroughputLayout::new(&inst);
        let rows = Arc::new(ThroughputRows::new(&inst, &layout));
        Pair { inst, layout, rows }
    }

    /// Both on r0, `K[a,b] = 0`, `K[b,a] = 1`.
    fn ordered(layout: &ThroughputLayout) -> TrialPoint {
        let mut point = vec![0.0; layout.len()];
        point[layout.m(0, 0)] = 1.0;
        point[layout.m(1, 0)] = 1.0;
        point[layout.k(1)] = 1.0;
        TrialPoint::new(point, 0.5)
    }

    #[test]
    fn test_primal_throughput() {
        let p = pair();
        let primal = ThroughputPrimal::new(p.inst.clone(), p.rows.clone(), SolverConfig::named("primal_sub"));
        let model = primal.build(&SubproblemInput::new(&ordered(&p.layout))).unwrap();
        // u: 2, tau, y: 2
        assert_eq!(model.num_vars(), 5);
        assert_eq!(model.num_constraints(), p.rows.len());

        let out = MicrolpSolver::new().solve(&model, None).unwrap();
        assert_eq!(out.status, BackendStatus::Optimal);
        assert!((out.value(primal.throughput()).unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_dual_matches_primal() {
        let p = pair();
        let dual = ThroughputDual::new(p.inst.clone(), p.rows.clone(), SolverConfig::named("dual_sub"));
        let model = dual.build(&SubproblemInput::new(&ordered(&p.layout))).unwrap();
        assert_eq!(model.num_vars(), p.rows.len());
        // tau, 2 starts, 2 shares
        assert_eq!(model.num_constraints(), 5);

        let out = MicrolpSolver::new().solve(&model, None).unwrap();
        assert_eq!(out.status, BackendStatus::Optimal);
        assert!((out.objective.unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_auxiliary_keeps_dual_optimal() {
        let p = pair();
        let aux = ThroughputAuxiliary::new(
            p.inst.clone(),
            p.rows.clone(),
            SolverConfig::named("aux_sub"),
            1e-9,
        );
        let trial = ordered(&p.layout);
        let core = CorePoint::scaled(&trial, 0.5);
        let input = SubproblemInput::new(&trial).with_stabilization(&core, 0.2);
        let model = aux.build(&input).unwrap();
        assert_eq!(model.sense(), ObjectiveSense::Minimize);
        assert_eq!(model.constraints().last().unwrap().name, "optimality");

        let out = MicrolpSolver::new().solve(&model, None).unwrap();
        assert!(out.has_solution());
        let at_trial = p.rows.dual_objective(trial.discrete()).evaluate(&out.values);
        assert!(at_trial <= 0.2 + 1e-6);
        assert!(at_trial >= 0.2 - 1e-6);
    }
}
