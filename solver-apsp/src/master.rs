//! Master problem: allocation and ordering with a fixed period estimate.

use solver_lbbd::{
    ConstraintSense, LbbdResult, LinearExpr, LinearModel, MasterAdapter, ObjectiveSense,
    SolveOutcome, SolverConfig, TrialPoint, VarId,
};

use crate::instance::ApspInstance;
use crate::layout::DiscreteLayout;

/// Master MILP over `x`, `y`, start proxies `w` and the period `μ`.
///
/// Timing rows use the period upper bound in place of `μ`, so `μ` is only
/// driven up by optimality cuts.
pub struct ApspMaster {
    model: LinearModel,
    layout: DiscreteLayout,
    discrete: Vec<VarId>,
    period: VarId,
}

impl ApspMaster {
    /// Build the master for `instance`.
    pub fn new(instance: &ApspInstance, config: SolverConfig) -> LbbdResult<Self> {
        let layout = DiscreteLayout::new(instance);
        let mut model = LinearModel::new(config.name.clone(), ObjectiveSense::Minimize, config);
        let tasks = instance.tasks();
        let resources = instance.resources();

        for task in tasks {
            for (r, _) in &task.options {
                model.add_binary(format!("x_{}_{}", task.name, resources[*r]));
            }
        }
        for pair in instance.overlaps() {
            for m in instance.offsets() {
                model.add_binary(format!(
                    "y_{}_{}_{}",
                    tasks[pair.first].name, tasks[pair.second].name, m
                ));
            }
        }
        let discrete = layout.var_ids();

        let period_ub = instance.period_ub();
        let horizon = instance.bound() as f64 * period_ub;
        let w: Vec<VarId> = tasks
            .iter()
            .map(|t| model.add_continuous(format!("w_{}", t.name), 0.0, horizon))
            .collect();
        let period = model.add_continuous("mu", 0.0, f64::INFINITY);

        for (a, task) in tasks.iter().enumerate() {
            let assigned: LinearExpr = (0..task.options.len())
                .map(|o| LinearExpr::from(VarId::new(layout.x(a, o))))
                .sum();
            model.add_constraint(format!("assign_{}", task.name), assigned, ConstraintSense::Eq, 1.0)?;
        }

        for (d, dep) in instance.dependencies().iter().enumerate() {
            // w_to >= w_from - tokens·ub + D_from(x)
            let rhs = LinearExpr::from(w[dep.from]) - f64::from(dep.tokens) * period_ub
                + layout.duration_expr(instance, dep.from);
            model.add_constraint(format!("dep_{}", d), w[dep.to], ConstraintSense::Ge, rhs)?;
        }

        let big_m = instance.big_m();
        for (o, pair) in instance.overlaps().iter().enumerate() {
            let (i, j) = (pair.first, pair.second);
            for &p in &pair.resources {
                let (Some(oi), Some(oj)) = (tasks[i].option_of(p), tasks[j].option_of(p)) else {
                    continue;
                };
                let (di, dj) = (tasks[i].options[oi].1, tasks[j].options[oj].1);
                let xi = VarId::new(layout.x(i, oi));
                let xj = VarId::new(layout.x(j, oj));

                for m in instance.offsets() {
                    let y = VarId::new(layout.y(o, m));
                    let shift = m as f64 * period_ub;

                    // w_i + τ_ip + m·ub <= w_j + M(3 - x_ip - x_jp - y)
                    let lhs = LinearExpr::from(w[i]) + di + shift;
                    let rhs = LinearExpr::from(w[j]) + 3.0 * big_m
                        - LinearExpr::term(xi, big_m)
                        - LinearExpr::term(xj, big_m)
                        - LinearExpr::term(y, big_m);
                    model.add_constraint(
                        format!("left_{}_{}_{}", o, p, m),
                        lhs,
                        ConstraintSense::Le,
                        rhs,
                    )?;

                    // w_j + τ_jp <= w_i + m·ub + M(2 - x_ip - x_jp + y)
                    let lhs = LinearExpr::from(w[j]) + dj;
                    let rhs = LinearExpr::from(w[i]) + shift + 2.0 * big_m
                        - LinearExpr::term(xi, big_m)
                        - LinearExpr::term(xj, big_m)
                        + LinearExpr::term(y, big_m);
                    model.add_constraint(
                        format!("right_{}_{}_{}", o, p, m),
                        lhs,
                        ConstraintSense::Le,
                        rhs,
                    )?;
                }
            }
        }

        model.set_objective(LinearExpr::from(period))?;
        log::debug!(
            "master for {}: {} vars, {} rows",
            instance.name(),
            model.num_vars(),
            model.num_constraints()
        );

        Ok(Self {
            model,
            layout,
            discrete,
            period,
        })
    }

    /// Discrete layout shared with the subproblems.
    pub fn layout(&self) -> &DiscreteLayout {
        &self.layout
    }

    /// Id of the period variable.
    pub fn period(&self) -> VarId {
        self.period
    }
}

impl MasterAdapter for ApspMaster {
    fn model(&self) -> &LinearModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut LinearModel {
        &mut self.model
    }

    fn extract_trial_point(&self, outcome: &SolveOutcome) -> LbbdResult<TrialPoint> {
        TrialPoint::from_outcome(outcome, &self.discrete, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_lbbd::{BackendStatus, MicrolpSolver, Solver};

    fn toy() -> ApspInstance {
        ApspInstance::from_json_str(
            r#"{"resources": ["r0", "r1"],
                "tasks": [{"name": "t0", "durations": {"r0": 2, "r1": 4}},
                          {"name": "t1", "durations": {"r1": 3}}],
                "dependencies": [{"from": "t0", "to": "t1", "tokens": 1}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_master_shape() {
        let master = ApspMaster::new(&toy(), SolverConfig::named("master")).unwrap();
        let model = master.model();
        // x: 3, y: 2 x 5, w: 2, mu
        assert_eq!(model.num_vars(), 3 + 10 + 2 + 1);
        // assign: 2, dep: 1, no-overlap: 2 pairs x 5 offsets x 2
        assert_eq!(model.num_constraints(), 2 + 1 + 20);
        assert_eq!(master.period(), VarId::new(15));
        assert_eq!(model.find_var("x_t1_r1"), Some(VarId::new(2)));
    }

    #[test]
    fn test_uncut_master_has_zero_period() {
        let master = ApspMaster::new(&toy(), SolverConfig::named("master")).unwrap();
        let out = MicrolpSolver::new().solve(master.model(), None).unwrap();
        assert_eq!(out.status, BackendStatus::Optimal);
        assert!(out.objective.unwrap().abs() < 1e-9);

        let trial = master.extract_trial_point(&out).unwrap();
        assert_eq!(trial.len(), master.layout().len());
        assert_eq!(trial.get(master.layout().x(1, 0)), 1.0);
        let t0: f64 = (0..2).map(|o| trial.get(master.layout().x(0, o))).sum();
        assert_eq!(t0, 1.0);
    }
}
