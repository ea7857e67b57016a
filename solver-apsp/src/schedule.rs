//! Periodic schedules read back from solved models.

use std::fmt;

use serde::Serialize;

use crate::error::{ApspError, ApspResult};
use crate::instance::ApspInstance;
use crate::layout::DiscreteLayout;

/// One execution of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTask {
    /// Task name.
    pub task: String,

    /// Resource the task runs on.
    pub resource: String,

    /// Start time.
    pub start: f64,

    /// Duration on that resource.
    pub duration: f64,

    /// Repetition index; start is shifted by `repetition · period`.
    pub repetition: usize,
}

impl ScheduledTask {
    /// Completion time.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Executions of every task over a number of repetitions, sorted by resource then start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    /// Period.
    pub period: f64,

    /// All executions.
    pub entries: Vec<ScheduledTask>,
}

impl Schedule {
    /// Build from an assignment point (over `layout`), start times and a period.
    pub fn build(
        instance: &ApspInstance,
        layout: &DiscreteLayout,
        assignment: &[f64],
        starts: &[f64],
        period: f64,
        repetitions: usize,
    ) -> ApspResult<Self> {
        if starts.len() != instance.num_tasks() {
            return Err(ApspError::NoSolution(format!(
                "expected {} start times, got {}",
                instance.num_tasks(),
                starts.len()
            )));
        }

        let mut entries = Vec::with_capacity(instance.num_tasks() * repetitions);
        for rep in 0..repetitions {
            for (a, task) in instance.tasks().iter().enumerate() {
                let option = layout
                    .assigned_option(a, assignment)
                    .ok_or_else(|| ApspError::Unassigned(task.name.clone()))?;
                let (resource, duration) = task.options[option];
                entries.push(ScheduledTask {
                    task: task.name.clone(),
                    resource: instance.resources()[resource].clone(),
                    start: starts[a] + rep as f64 * period,
                    duration,
                    repetition: rep,
                });
            }
        }
        entries.sort_by(|a, b| {
            a.resource
                .cmp(&b.resource)
                .then(a.start.total_cmp(&b.start))
        });

        Ok(Self { period, entries })
    }

    /// Returns true if no two executions on the same resource intersect.
    pub fn is_overlap_free(&self, tol: f64) -> bool {
        self.entries.windows(2).all(|w| {
            w[0].resource != w[1].resource || w[0].end() <= w[1].start + tol
        })
    }

    /// Executions on `resource`.
    pub fn on_resource<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a ScheduledTask> + 'a {
        self.entries.iter().filter(move |e| e.resource == resource)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "period: {}", self.period)?;
        writeln!(
            f,
            "{:<12} {:<12} {:>10} {:>10} {:>4}",
            "resource", "task", "start", "duration", "rep"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "{:<12} {:<12} {:>10.3} {:>10.3} {:>4}",
                e.resource, e.task, e.start, e.duration, e.repetition
            )?;
        }
        Ok(())
    }
}
