//! Rows of the throughput subproblem.
//!
//! Start times are normalized by the period (`u = s / μ`) and the objective
//! is the throughput `τ = 1 / μ`. For a fixed allocation `m̄` and repetition
//! distances `K̄` the subproblem is the LP
//!
//! ```text
//! max τ  s.t.  Σ_a c[r,a]·u[a] + t[r]·τ + Σ_(a,o) e[r,a,o]·y[a,o]  (<= | =)  rhs[r](m̄, K̄)
//!              u, τ, y >= 0
//! ```
//!
//! where `y[a,o]` carries `τ` on the chosen resource of `a`. The dual takes one
//! multiplier per row (free on the equality rows) and the optimality cut is
//! `z <= Σ_r π[r]·rhs[r](m, K)`.

use solver_lbbd::{LinearExpr, VarId};

use crate::instance::ApspInstance;
use crate::throughput::layout::ThroughputLayout;

/// What a throughput row expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThroughputRowKind {
    /// `τ <= Σ_o m[a,o] / d[a,o]`.
    Rate {
        /// Task index.
        task: usize,
    },
    /// `u[from] + d(from)·τ <= u[to] + tokens`.
    Precedence {
        /// Dependency index.
        dependency: usize,
    },
    /// `u[first] + d(first)·τ <= u[second] + K` when both run on `resource`.
    Disjunctive {
        /// Overlap index.
        overlap: usize,
        /// Resource index.
        resource: usize,
    },
    /// `y[a,o] <= m[a,o]`.
    Share {
        /// Task index.
        task: usize,
        /// Option index.
        option: usize,
    },
    /// `Σ_o y[a,o] = τ`.
    Balance {
        /// Task index.
        task: usize,
    },
}

/// One subproblem row.
#[derive(Debug, Clone)]
pub struct ThroughputRow {
    /// Row kind.
    pub kind: ThroughputRowKind,

    /// Row name, also used for the matching multiplier.
    pub name: String,

    /// `(task, coefficient)` of the normalized start times.
    pub starts: Vec<(usize, f64)>,

    /// Coefficient of τ.
    pub rate: f64,

    /// `(share column, coefficient)`; share columns follow the assignment layout.
    pub shares: Vec<(usize, f64)>,

    /// Right-hand side as an affine function of the layout indices.
    pub rhs: LinearExpr,

    /// Equality row (free multiplier).
    pub equality: bool,
}

/// All rows of an instance, in a fixed order.
#[derive(Debug, Clone)]
pub struct ThroughputRows {
    rows: Vec<ThroughputRow>,
    num_tasks: usize,
    num_shares: usize,
    num_discrete: usize,
}

impl ThroughputRows {
    /// Build the row table of `instance` over `layout`.
    ///
    /// Every duration must be positive.
    pub fn new(instance: &ApspInstance, layout: &ThroughputLayout) -> Self {
        let tasks = instance.tasks();
        let p1 = max_duration(instance);
        let mut rows = Vec::new();

        for (a, task) in tasks.iter().enumerate() {
            let mut rhs = LinearExpr::new();
            for (o, (_, d)) in task.options.iter().enumerate() {
                rhs.add_term(VarId::new(layout.m(a, o)), 1.0 / d);
            }
            rows.push(ThroughputRow {
                kind: ThroughputRowKind::Rate { task: a },
                name: format!("rate_{}", task.name),
                starts: Vec::new(),
                rate: 1.0,
                shares: Vec::new(),
                rhs,
                equality: false,
            });
        }

        for (d, dep) in instance.dependencies().iter().enumerate() {
            let shares = tasks[dep.from]
                .options
                .iter()
                .enumerate()
                .map(|(o, (_, dur))| (layout.m(dep.from, o), *dur))
                .collect();
            rows.push(ThroughputRow {
                kind: ThroughputRowKind::Precedence { dependency: d },
                name: format!("dep_{}_{}_{}", tasks[dep.from].name, tasks[dep.to].name, d),
                starts: vec![(dep.from, 1.0), (dep.to, -1.0)],
                rate: 0.0,
                shares,
                rhs: LinearExpr::constant(f64::from(dep.tokens)),
                equality: false,
            });
        }

        for (o, pair) in instance.overlaps().iter().enumerate() {
            let (i, j) = (pair.first, pair.second);
            for &p in &pair.resources {
                let (Some(oi), Some(oj)) = (tasks[i].option_of(p), tasks[j].option_of(p)) else {
                    continue;
                };
                // P1·(2 - m_ip - m_jp) + K_ij
                let rhs = LinearExpr::constant(2.0 * p1)
                    .with_term(VarId::new(layout.m(i, oi)), -p1)
                    .with_term(VarId::new(layout.m(j, oj)), -p1)
                    .with_term(VarId::new(layout.k(o)), 1.0);
                rows.push(ThroughputRow {
                    kind: ThroughputRowKind::Disjunctive {
                        overlap: o,
                        resource: p,
                    },
                    name: format!(
                        "disj_{}_{}_{}",
                        tasks[i].name,
                        tasks[j].name,
                        instance.resources()[p]
                    ),
                    starts: vec![(i, 1.0), (j, -1.0)],
                    rate: 0.0,
                    shares: vec![(layout.m(i, oi), tasks[i].options[oi].1)],
                    rhs,
                    equality: false,
                });
            }
        }

        for (a, task) in tasks.iter().enumerate() {
            for (o, (r, _)) in task.options.iter().enumerate() {
                rows.push(ThroughputRow {
                    kind: ThroughputRowKind::Share { task: a, option: o },
                    name: format!("share_{}_{}", task.name, instance.resources()[*r]),
                    starts: Vec::new(),
                    rate: 0.0,
                    shares: vec![(layout.m(a, o), 1.0)],
                    rhs: LinearExpr::from(VarId::new(layout.m(a, o))),
                    equality: false,
                });
            }
            rows.push(ThroughputRow {
                kind: ThroughputRowKind::Balance { task: a },
                name: format!("balance_{}", task.name),
                starts: Vec::new(),
                rate: -1.0,
                shares: (0..task.options.len()).map(|o| (layout.m(a, o), 1.0)).collect(),
                rhs: LinearExpr::new(),
                equality: true,
            });
        }

        Self {
            rows,
            num_tasks: tasks.len(),
            num_shares: layout.num_assignments(),
            num_discrete: layout.len(),
        }
    }

    /// All rows.
    pub fn rows(&self) -> &[ThroughputRow] {
        &self.rows
    }

    /// Number of rows (and multipliers).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of normalized start-time columns.
    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    /// Number of share columns.
    pub fn num_shares(&self) -> usize {
        self.num_shares
    }

    /// Length of the points the right-hand sides are evaluated at.
    pub fn num_discrete(&self) -> usize {
        self.num_discrete
    }

    /// `Σ_r π[r]·rhs[r](point)` over multiplier ids `0..len()`.
    pub fn dual_objective(&self, point: &[f64]) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (r, row) in self.rows.iter().enumerate() {
            expr.add_term(VarId::new(r), row.rhs.evaluate(point));
        }
        expr
    }

    /// `Σ_r π[r]·rhs[r](m, K)` with fixed multipliers, over layout indices.
    pub fn cut_rhs(&self, multipliers: &[f64]) -> LinearExpr {
        self.rows
            .iter()
            .zip(multipliers)
            .filter(|(_, &pi)| pi != 0.0)
            .map(|(row, &pi)| row.rhs.clone() * pi)
            .sum()
    }
}

/// Longest duration over all tasks and resources.
pub(crate) fn max_duration(instance: &ApspInstance) -> f64 {
    instance
        .tasks()
        .iter()
        .map(|t| t.max_duration())
        .fold(0.0, f64::max)
}
