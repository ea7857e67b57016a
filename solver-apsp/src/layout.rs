//! Position of every discrete master decision in the trial point.
//!
//! The master declares assignment variables `x[task, resource]` first, then
//! ordering variables `y[overlap, offset]`, so a layout index is also the
//! master [`VarId`] of that decision.

use solver_lbbd::{LinearExpr, VarId};

use crate::instance::ApspInstance;

/// Indices of `x` and `y` in the discrete part of a trial point.
#[derive(Debug, Clone)]
pub struct DiscreteLayout {
    assignment: Vec<Vec<usize>>,
    ordering: Vec<Vec<usize>>,
    len: usize,
}

impl DiscreteLayout {
    /// Layout for `instance`.
    pub fn new(instance: &ApspInstance) -> Self {
        let mut next = 0;
        let assignment = instance
            .tasks()
            .iter()
            .map(|t| {
                let idx: Vec<usize> = (next..next + t.options.len()).collect();
                next += t.options.len();
                idx
            })
            .collect();
        let offsets = instance.offsets().count();
        let ordering = instance
            .overlaps()
            .iter()
            .map(|_| {
                let idx: Vec<usize> = (next..next + offsets).collect();
                next += offsets;
                idx
            })
            .collect();
        Self {
            assignment,
            ordering,
            len: next,
        }
    }

    /// Index of `x[task, option]`, `option` being a position in the task's options.
    pub fn x(&self, task: usize, option: usize) -> usize {
        self.assignment[task][option]
    }

    /// Index of `y[overlap, offset]`.
    pub fn y(&self, overlap: usize, offset: usize) -> usize {
        self.ordering[overlap][offset]
    }

    /// Number of discrete decisions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no discrete decisions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of assignment variables. They occupy `0..num_assignments()`.
    pub fn num_assignments(&self) -> usize {
        self.assignment.iter().map(Vec::len).sum()
    }

    /// Master ids of all discrete decisions, in layout order.
    pub fn var_ids(&self) -> Vec<VarId> {
        (0..self.len).map(VarId::new).collect()
    }

    /// `Σ_r τ[task, r] · x[task, r]` over layout indices.
    pub fn duration_expr(&self, instance: &ApspInstance, task: usize) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (o, (_, d)) in instance.tasks()[task].options.iter().enumerate() {
            expr.add_term(VarId::new(self.x(task, o)), *d);
        }
        expr
    }

    /// Resource the task is assigned to at `point` (the option with the largest value).
    pub fn assigned_option(&self, task: usize, point: &[f64]) -> Option<usize> {
        self.assignment[task]
            .iter()
            .enumerate()
            .filter(|(_, &i)| point.get(i).copied().unwrap_or(0.0) > 0.5)
            .map(|(o, _)| o)
            .next()
    }
}
