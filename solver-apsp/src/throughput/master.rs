//! Throughput master: allocation, repetition distances and a throughput estimate.

use solver_lbbd::{
    ConstraintSense, LbbdResult, LinearExpr, LinearModel, MasterAdapter, ObjectiveSense,
    SolveOutcome, SolverConfig, TrialPoint, VarId,
};

use crate::error::{ApspError, ApspResult};
use crate::instance::ApspInstance;
use crate::throughput::layout::ThroughputLayout;
use crate::throughput::rows::max_duration;

/// `max z` over `m`, `K`, normalized start proxies `w` and the throughput `z`.
///
/// Timing rows use the sequential throughput `1 / Σ_a max_r d[a,r]` as a lower
/// bound on `τ`, so `z` is only pulled down by optimality cuts.
pub struct ThroughputMaster {
    model: LinearModel,
    layout: ThroughputLayout,
    discrete: Vec<VarId>,
    throughput: VarId,
}

impl ThroughputMaster {
    /// Build the master for `instance`. Every duration must be positive.
    pub fn new(instance: &ApspInstance, config: SolverConfig) -> ApspResult<Self> {
        if let Some(task) = instance.tasks().iter().find(|t| t.has_zero_duration()) {
            return Err(ApspError::InvalidInstance(format!(
                "throughput model needs positive durations, task {} has none",
                task.name
            )));
        }
        Ok(Self::build(instance, config)?)
    }

    fn build(instance: &ApspInstance, config: SolverConfig) -> LbbdResult<Self> {
        let layout = ThroughputLayout::new(instance);
        let mut model = LinearModel::new(config.name.clone(), ObjectiveSense::Maximize, config);
        let tasks = instance.tasks();
        let resources = instance.resources();
        let bound = instance.bound() as f64;

        for task in tasks {
            for (r, _) in &task.options {
                model.add_binary(format!("m_{}_{}", task.name, resources[*r]));
            }
        }
        for pair in instance.overlaps() {
            model.add_integer(
                format!("K_{}_{}", tasks[pair.first].name, tasks[pair.second].name),
                -bound,
                bound,
            );
        }
        let discrete = layout.var_ids();

        // No task repeats faster than its quickest resource allows.
        let z_ub = tasks
            .iter()
            .map(|t| t.options.iter().map(|(_, d)| 1.0 / d).fold(0.0, f64::max))
            .fold(f64::INFINITY, f64::min);
        let throughput = model.add_continuous("z", 0.0, z_ub);
        let w: Vec<VarId> = tasks
            .iter()
            .map(|t| model.add_continuous(format!("w_{}", t.name), 0.0, f64::INFINITY))
            .collect();

        for (a, task) in tasks.iter().enumerate() {
            let assigned: LinearExpr = (0..task.options.len())
                .map(|o| LinearExpr::from(VarId::new(layout.m(a, o))))
                .sum();
            model.add_constraint(format!("assign_{}", task.name), assigned, ConstraintSense::Eq, 1.0)?;
        }

        for (o, pair) in instance.overlaps().iter().enumerate() {
            if pair.first > pair.second {
                continue;
            }
            let reverse = instance
                .overlaps()
                .iter()
                .position(|q| q.first == pair.second && q.second == pair.first);
            if let Some(r) = reverse {
                let sum = LinearExpr::from(VarId::new(layout.k(o))) + LinearExpr::from(VarId::new(layout.k(r)));
                model.add_constraint(
                    format!("distance_{}_{}", tasks[pair.first].name, tasks[pair.second].name),
                    sum,
                    ConstraintSense::Eq,
                    1.0,
                )?;
            }
        }

        let p1 = max_duration(instance);
        let t_lb = 1.0 / instance.period_ub();

        for (d, dep) in instance.dependencies().iter().enumerate() {
            for (o, (_, dur)) in tasks[dep.from].options.iter().enumerate() {
                // P1(1 - m) + w_to + tokens >= w_from + T_lb·d
                let m = VarId::new(layout.m(dep.from, o));
                let lhs = LinearExpr::from(w[dep.to]) - LinearExpr::term(m, p1)
                    + (p1 + f64::from(dep.tokens));
                let rhs = LinearExpr::from(w[dep.from]) + t_lb * dur;
                model.add_constraint(format!("dep_{}_{}", d, o), lhs, ConstraintSense::Ge, rhs)?;
            }
        }

        for (o, pair) in instance.overlaps().iter().enumerate() {
            let (i, j) = (pair.first, pair.second);
            for &p in &pair.resources {
                let (Some(oi), Some(oj)) = (tasks[i].option_of(p), tasks[j].option_of(p)) else {
                    continue;
                };
                // P1(2 - m_ip - m_jp) + w_j + K_ij >= w_i + T_lb·d_ip
                let lhs = LinearExpr::from(w[j]) + LinearExpr::from(VarId::new(layout.k(o))) + 2.0 * p1
                    - LinearExpr::term(VarId::new(layout.m(i, oi)), p1)
                    - LinearExpr::term(VarId::new(layout.m(j, oj)), p1);
                let rhs = LinearExpr::from(w[i]) + t_lb * tasks[i].options[oi].1;
                model.add_constraint(format!("disj_{}_{}", o, p), lhs, ConstraintSense::Ge, rhs)?;
            }
        }

        model.set_objective(LinearExpr::from(throughput))?;
        log::debug!(
            "throughput master for {}: {} vars, {} rows",
            instance.name(),
            model.num_vars(),
            model.num_constraints()
        );

        Ok(Self {
            model,
            layout,
            discrete,
            throughput,
        })
    }

    /// Discrete layout shared with the subproblems.
    pub fn layout(&self) -> &ThroughputLayout {
        &self.layout
    }

    /// Id of the throughput variable.
    pub fn throughput(&self) -> VarId {
        self.throughput
    }
}

impl MasterAdapter for ThroughputMaster {
    fn model(&self) -> &LinearModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut LinearModel {
        &mut self.model
    }

    fn extract_trial_point(&self, outcome: &SolveOutcome) -> LbbdResult<TrialPoint> {
        TrialPoint::from_outcome(outcome, &self.discrete, self.throughput)
    }
}
