//! Rows of the scheduling subproblem.
//!
//! For a fixed allocation the subproblem is the LP
//!
//! ```text
//! min μ  s.t.  Σ_a c[r,a]·s[a] + m[r]·μ >= rhs[r](x, y)   for every row r
//!              s >= 0, μ >= 0
//! ```
//!
//! The primal subproblem states these rows directly; the dual and auxiliary
//! subproblems take one multiplier `π[r] >= 0` per row, and the optimality
//! cut is `μ >= Σ_r π[r]·rhs[r](x, y)`. Keeping the row table in one place
//! keeps the three models and the cut consistent.

use solver_lbbd::{LbbdError, LbbdResult, LinearExpr, VarId};

use crate::instance::ApspInstance;
use crate::layout::DiscreteLayout;

/// What a subproblem row expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// `s[to] - s[from] + tokens·μ >= D[from]`.
    Precedence {
        /// Dependency index.
        dependency: usize,
    },
    /// `μ >= D[task]`: consecutive executions of a task do not overlap.
    SelfOverlap {
        /// Task index.
        task: usize,
    },
    /// `s[task] <= bound·μ`.
    StartBound {
        /// Task index.
        task: usize,
    },
    /// `first` ends before `second` starts, `offset` periods later.
    Left {
        /// Overlap index.
        overlap: usize,
        /// Resource index.
        resource: usize,
        /// Repetition offset.
        offset: usize,
    },
    /// `second` ends before `first` starts, `offset` periods later.
    Right {
        /// Overlap index.
        overlap: usize,
        /// Resource index.
        resource: usize,
        /// Repetition offset.
        offset: usize,
    },
}

/// One row `Σ starts·s + period·μ >= rhs(x, y)`.
#[derive(Debug, Clone)]
pub struct ScheduleRow {
    /// Row kind.
    pub kind: RowKind,

    /// Row name, also used for the matching multiplier.
    pub name: String,

    /// `(task, coefficient)` of the start-time variables.
    pub starts: Vec<(usize, f64)>,

    /// Coefficient of μ.
    pub period: f64,

    /// Right-hand side as an affine function of the layout indices.
    pub rhs: LinearExpr,
}

/// All rows of an instance, in a fixed order.
#[derive(Debug, Clone)]
pub struct ScheduleRows {
    rows: Vec<ScheduleRow>,
    num_tasks: usize,
    num_discrete: usize,
}

impl ScheduleRows {
    /// Build the row table of `instance` over `layout`.
    pub fn new(instance: &ApspInstance, layout: &DiscreteLayout) -> Self {
        let tasks = instance.tasks();
        let big_m = instance.big_m();
        let mut rows = Vec::new();

        for (d, dep) in instance.dependencies().iter().enumerate() {
            rows.push(ScheduleRow {
                kind: RowKind::Precedence { dependency: d },
                name: format!("dep_{}_{}_{}", tasks[dep.from].name, tasks[dep.to].name, d),
                starts: vec![(dep.to, 1.0), (dep.from, -1.0)],
                period: f64::from(dep.tokens),
                rhs: layout.duration_expr(instance, dep.from),
            });
        }

        for (a, task) in tasks.iter().enumerate() {
            if !task.has_zero_duration() {
                rows.push(ScheduleRow {
                    kind: RowKind::SelfOverlap { task: a },
                    name: format!("cycle_{}", task.name),
                    starts: Vec::new(),
                    period: 1.0,
                    rhs: layout.duration_expr(instance, a),
                });
            }
            rows.push(ScheduleRow {
                kind: RowKind::StartBound { task: a },
                name: format!("start_{}", task.name),
                starts: vec![(a, -1.0)],
                period: instance.bound() as f64,
                rhs: LinearExpr::new(),
            });
        }

        for (o, pair) in instance.overlaps().iter().enumerate() {
            let (i, j) = (pair.first, pair.second);
            for &p in &pair.resources {
                let (Some(oi), Some(oj)) = (tasks[i].option_of(p), tasks[j].option_of(p)) else {
                    continue;
                };
                let (di, dj) = (tasks[i].options[oi].1, tasks[j].options[oj].1);
                let xi = VarId::new(layout.x(i, oi));
                let xj = VarId::new(layout.x(j, oj));
                let names = format!(
                    "{}_{}_{}",
                    tasks[i].name,
                    tasks[j].name,
                    instance.resources()[p]
                );

                for m in instance.offsets() {
                    let y = VarId::new(layout.y(o, m));

                    // τ_ip - M(3 - x_ip - x_jp - y)
                    let left = LinearExpr::constant(di - 3.0 * big_m)
                        .with_term(xi, big_m)
                        .with_term(xj, big_m)
                        .with_term(y, big_m);
                    rows.push(ScheduleRow {
                        kind: RowKind::Left {
                            overlap: o,
                            resource: p,
                            offset: m,
                        },
                        name: format!("left_{}_{}", names, m),
                        starts: vec![(j, 1.0), (i, -1.0)],
                        period: -(m as f64),
                        rhs: left,
                    });

                    // τ_jp - M(2 - x_ip - x_jp + y)
                    let right = LinearExpr::constant(dj - 2.0 * big_m)
                        .with_term(xi, big_m)
                        .with_term(xj, big_m)
                        .with_term(y, -big_m);
                    rows.push(ScheduleRow {
                        kind: RowKind::Right {
                            overlap: o,
                            resource: p,
                            offset: m,
                        },
                        name: format!("right_{}_{}", names, m),
                        starts: vec![(i, 1.0), (j, -1.0)],
                        period: m as f64,
                        rhs: right,
                    });
                }
            }
        }

        Self {
            rows,
            num_tasks: tasks.len(),
            num_discrete: layout.len(),
        }
    }

    /// All rows.
    pub fn rows(&self) -> &[ScheduleRow] {
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

    /// Number of start-time columns.
    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    /// Length of the points the right-hand sides are evaluated at.
    pub fn num_discrete(&self) -> usize {
        self.num_discrete
    }

    /// `Σ_r π[r]·rhs[r](point)` as an expression over multiplier ids `0..len()`.
    pub fn dual_objective(&self, point: &[f64]) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (r, row) in self.rows.iter().enumerate() {
            expr.add_term(VarId::new(r), row.rhs.evaluate(point));
        }
        expr
    }

    /// `Σ_r π[r]·rhs[r](x, y)` with fixed multipliers, over layout indices.
    pub fn cut_rhs(&self, multipliers: &[f64]) -> LinearExpr {
        self.rows
            .iter()
            .zip(multipliers)
            .filter(|(_, &pi)| pi != 0.0)
            .map(|(row, &pi)| row.rhs.clone() * pi)
            .sum()
    }
}

/// Fail unless `point` has `expected` values.
pub(crate) fn check_point(what: &str, point: &[f64], expected: usize) -> LbbdResult<()> {
    if point.len() == expected {
        Ok(())
    } else {
        Err(LbbdError::InvalidPoint(format!(
            "{} has {} values, expected {}",
            what,
            point.len(),
            expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (ApspInstance, DiscreteLayout) {
        let inst = ApspInstance::from_json_str(
            r#"{"resources": ["r0", "r1"],
                "tasks": [{"name": "t0", "durations": {"r0": 2, "r1": 4}},
                          {"name": "t1", "durations": {"r1": 3}}],
                "dependencies": [{"from": "t0", "to": "t1", "tokens": 1}]}"#,
        )
        .unwrap();
        let layout = DiscreteLayout::new(&inst);
        (inst, layout)
    }

    #[test]
    fn test_row_counts() {
        let (inst, layout) = toy();
        let rows = ScheduleRows::new(&inst, &layout);
        // 1 precedence, 2 self-overlap, 2 start bounds, 2 pairs x 1 resource x 5 offsets x 2.
        assert_eq!(rows.len(), 1 + 2 + 2 + 20);
        assert_eq!(rows.num_tasks(), 2);
        assert_eq!(rows.rows()[0].name, "dep_t0_t1_0");
    }

    #[test]
    fn test_rhs_relaxed_when_not_colocated() {
        let (inst, layout) = toy();
        let rows = ScheduleRows::new(&inst, &layout);
        let mut point = vec![0.0; layout.len()];
        point[layout.x(0, 0)] = 1.0;
        point[layout.x(1, 0)] = 1.0;

        for row in rows.rows() {
            let rhs = row.rhs.evaluate(&point);
            match row.kind {
                RowKind::Left { .. } | RowKind::Right { .. } => assert!(rhs <= 4.0 - inst.big_m()),
                RowKind::Precedence { .. } => assert_eq!(rhs, 2.0),
                RowKind::SelfOverlap { task } => assert_eq!(rhs, [2.0, 3.0][task]),
                RowKind::StartBound { .. } => assert_eq!(rhs, 0.0),
            }
        }
    }

    #[test]
    fn test_cut_rhs_skips_zero_multipliers() {
        let (inst, layout) = toy();
        let rows = ScheduleRows::new(&inst, &layout);
        let mut pi = vec![0.0; rows.len()];
        let cycle = rows.rows().iter().position(|r| r.name == "cycle_t1").unwrap();
        pi[cycle] = 1.0;
        let cut = rows.cut_rhs(&pi);
        assert_eq!(cut.num_terms(), 1);
        assert_eq!(cut.coefficient(VarId::new(layout.x(1, 0))), 3.0);
    }
}
