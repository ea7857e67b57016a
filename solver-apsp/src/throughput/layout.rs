//! Discrete decisions of the throughput master.
//!
//! Assignment binaries `m[task, resource]` come first, then one repetition
//! distance `K[overlap]` per ordered overlapping pair.

use solver_lbbd::VarId;

use crate::instance::ApspInstance;

/// Indices of `m` and `K` in the discrete part of a trial point.
#[derive(Debug, Clone)]
pub struct ThroughputLayout {
    assignment: Vec<Vec<usize>>,
    first_distance: usize,
    len: usize,
}

impl ThroughputLayout {
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
        Self {
            assignment,
            first_distance: next,
            len: next + instance.overlaps().len(),
        }
    }

    /// Index of `m[task, option]`.
    pub fn m(&self, task: usize, option: usize) -> usize {
        self.assignment[task][option]
    }

    /// Index of `K[overlap]`.
    pub fn k(&self, overlap: usize) -> usize {
        self.first_distance + overlap
    }

    /// Number of assignment binaries. They occupy `0..num_assignments()`.
    pub fn num_assignments(&self) -> usize {
        self.first_distance
    }

    /// Number of discrete decisions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no discrete decisions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Master ids of all discrete decisions, in layout order.
    pub fn var_ids(&self) -> Vec<VarId> {
        (0..self.len).map(VarId::new).collect()
    }

    /// Option chosen for `task` at `point`.
    pub fn assigned_option(&self, task: usize, point: &[f64]) -> Option<usize> {
        self.assignment[task]
            .iter()
            .position(|&i| point.get(i).copied().unwrap_or(0.0) > 0.5)
    }
}
