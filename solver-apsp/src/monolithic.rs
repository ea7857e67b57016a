//! Single-model formulation of the scheduling problem.
//!
//! Same rows as the subproblem, with the allocation and ordering decisions as
//! binaries instead of data. Used to cross-check decomposition results.

use std::time::Duration;

use serde::Serialize;

use solver_lbbd::{
    BackendStatus, ConstraintSense, LbbdResult, LinearExpr, LinearModel, ObjectiveSense, Solver,
    SolverConfig, VarId,
};

use crate::error::ApspResult;
use crate::instance::ApspInstance;
use crate::layout::DiscreteLayout;
use crate::rows::ScheduleRows;
use crate::schedule::Schedule;

/// Monolithic MILP with its variable layout.
pub struct MonolithicModel {
    model: LinearModel,
    layout: DiscreteLayout,
    starts: Vec<VarId>,
    period: VarId,
}

/// Result of a monolithic solve.
#[derive(Debug, Clone, Serialize)]
pub struct MonolithicSolution {
    /// Backend status.
    pub status: BackendStatus,

    /// Optimal period, when solved.
    pub period: Option<f64>,

    /// Solve time in seconds.
    pub solve_time: f64,

    /// Schedule at the solution, when solved.
    pub schedule: Option<Schedule>,
}

impl MonolithicModel {
    /// Build the model for `instance`.
    pub fn new(instance: &ApspInstance, config: SolverConfig) -> LbbdResult<Self> {
        let layout = DiscreteLayout::new(instance);
        let rows = ScheduleRows::new(instance, &layout);
        let mut model = LinearModel::new(config.name.clone(), ObjectiveSense::Minimize, config);
        let tasks = instance.tasks();

        // x and y first, so layout indices are model ids.
        for task in tasks {
            for (r, _) in &task.options {
                model.add_binary(format!("x_{}_{}", task.name, instance.resources()[*r]));
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
        let starts: Vec<VarId> = tasks
            .iter()
            .map(|t| model.add_continuous(format!("s_{}", t.name), 0.0, f64::INFINITY))
            .collect();
        let period = model.add_continuous("mu", 0.0, f64::INFINITY);

        for (a, task) in tasks.iter().enumerate() {
            let assigned: LinearExpr = (0..task.options.len())
                .map(|o| LinearExpr::from(VarId::new(layout.x(a, o))))
                .sum();
            model.add_constraint(format!("assign_{}", task.name), assigned, ConstraintSense::Eq, 1.0)?;
        }

        for row in rows.rows() {
            let mut lhs = LinearExpr::term(period, row.period);
            for &(task, coef) in &row.starts {
                lhs.add_term(starts[task], coef);
            }
            model.add_constraint(row.name.as_str(), lhs, ConstraintSense::Ge, row.rhs.clone())?;
        }

        model.set_objective(LinearExpr::from(period))?;
        Ok(Self {
            model,
            layout,
            starts,
            period,
        })
    }

    /// The model.
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Solve and read back the schedule.
    pub fn solve<S: Solver>(
        &self,
        solver: &mut S,
        instance: &ApspInstance,
        time_limit: Option<Duration>,
        repetitions: usize,
    ) -> ApspResult<MonolithicSolution> {
        let out = solver.solve(&self.model, time_limit)?;
        let schedule = match out.value(self.period) {
            Some(period) => {
                let starts: Vec<f64> = self
                    .starts
                    .iter()
                    .map(|&s| out.value(s).unwrap_or(0.0))
                    .collect();
                Some(Schedule::build(
                    instance,
                    &self.layout,
                    &out.values[..self.layout.len()],
                    &starts,
                    period,
                    repetitions,
                )?)
            }
            None => None,
        };
        log::info!(
            "monolithic {}: {} ({:?})",
            instance.name(),
            out.status,
            out.objective
        );
        Ok(MonolithicSolution {
            status: out.status,
            period: out.objective,
            solve_time: out.solve_time.as_secs_f64(),
            schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_lbbd::MicrolpSolver;

    #[test]
    fn test_toy_optimum() {
        let inst = ApspInstance::from_json_str(
            r#"{"resources": ["r0", "r1"],
                "tasks": [{"name": "t0", "durations": {"r0": 2, "r1": 4}},
                          {"name": "t1", "durations": {"r1": 3}}],
                "dependencies": [{"from": "t0", "to": "t1", "tokens": 1}]}"#,
        )
        .unwrap();
        let mono = MonolithicModel::new(&inst, SolverConfig::named("monolithic")).unwrap();
        assert!(mono.model().is_mip());

        let sol = mono
            .solve(&mut MicrolpSolver::new(), &inst, None, 2)
            .unwrap();
        assert_eq!(sol.status, BackendStatus::Optimal);
        assert!((sol.period.unwrap() - 3.0).abs() < 1e-6);

        let schedule = sol.schedule.unwrap();
        assert_eq!(schedule.entries.len(), 4);
        assert!(schedule.on_resource("r0").all(|e| e.task == "t0"));
        assert!(schedule.is_overlap_free(1e-6));
    }
}
