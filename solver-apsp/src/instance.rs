//! Scheduling instances: JSON schema, validation and derived data.
//!
//! An instance lists resources, tasks with a duration for every resource
//! they may run on, and dependencies between tasks. A dependency carries a
//! token count: the number of iterations between the producing and the
//! consuming execution.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApspError, ApspResult};
use crate::sdf3::{from_sdf3_str, Sdf3Naming};

/// A task as written in the instance file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task name.
    pub name: String,

    /// Duration per eligible resource.
    pub durations: BTreeMap<String, f64>,
}

/// A dependency as written in the instance file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Producing task.
    pub from: String,

    /// Consuming task.
    pub to: String,

    /// Iteration distance between the two executions.
    #[serde(default)]
    pub tokens: u32,
}

/// Instance file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Instance name. Falls back to the file stem when loading from disk.
    #[serde(default)]
    pub name: String,

    /// Resource names.
    pub resources: Vec<String>,

    /// Tasks.
    pub tasks: Vec<TaskSpec>,

    /// Dependencies.
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// A validated task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Task name.
    pub name: String,

    /// `(resource index, duration)` in resource declaration order.
    pub options: Vec<(usize, f64)>,
}

impl Task {
    /// Duration on `resource`, if eligible.
    pub fn duration(&self, resource: usize) -> Option<f64> {
        self.options
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, d)| *d)
    }

    /// Position of `resource` in [`options`](Self::options).
    pub fn option_of(&self, resource: usize) -> Option<usize> {
        self.options.iter().position(|(r, _)| *r == resource)
    }

    /// Longest duration over all eligible resources.
    pub fn max_duration(&self) -> f64 {
        self.options.iter().map(|(_, d)| *d).fold(0.0, f64::max)
    }

    /// Returns true if the task takes no time on some resource.
    pub fn has_zero_duration(&self) -> bool {
        self.options.iter().any(|(_, d)| *d == 0.0)
    }
}

/// A validated dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Producing task index.
    pub from: usize,

    /// Consuming task index.
    pub to: usize,

    /// Iteration distance.
    pub tokens: u32,
}

/// An ordered task pair that can share a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// First task index.
    pub first: usize,

    /// Second task index.
    pub second: usize,

    /// Resources both tasks may run on.
    pub resources: Vec<usize>,
}

/// A validated instance with derived model data.
#[derive(Debug, Clone)]
pub struct ApspInstance {
    name: String,
    resources: Vec<String>,
    tasks: Vec<Task>,
    dependencies: Vec<Dependency>,
    overlaps: Vec<Overlap>,
    bound: usize,
    period_ub: f64,
    big_m: f64,
}

impl ApspInstance {
    /// Validate `spec` and derive overlaps and model constants.
    pub fn from_spec(spec: InstanceSpec) -> ApspResult<Self> {
        if spec.tasks.is_empty() {
            return Err(ApspError::InvalidInstance("instance has no tasks".into()));
        }

        let mut resource_index = HashMap::new();
        for (i, r) in spec.resources.iter().enumerate() {
            if resource_index.insert(r.as_str(), i).is_some() {
                return Err(ApspError::InvalidInstance(format!("duplicate resource {}", r)));
            }
        }

        let mut task_index = HashMap::new();
        let mut tasks = Vec::with_capacity(spec.tasks.len());
        for (i, t) in spec.tasks.iter().enumerate() {
            if task_index.insert(t.name.as_str(), i).is_some() {
                return Err(ApspError::InvalidInstance(format!("duplicate task {}", t.name)));
            }
            if t.durations.is_empty() {
                return Err(ApspError::InvalidInstance(format!(
                    "task {} has no eligible resource",
                    t.name
                )));
            }
            let mut options = Vec::with_capacity(t.durations.len());
            for (r, &d) in &t.durations {
                let Some(&ri) = resource_index.get(r.as_str()) else {
                    return Err(ApspError::UnknownResource {
                        task: t.name.clone(),
                        resource: r.clone(),
                    });
                };
                if !d.is_finite() || d < 0.0 {
                    return Err(ApspError::InvalidInstance(format!(
                        "task {} has invalid duration {} on {}",
                        t.name, d, r
                    )));
                }
                options.push((ri, d));
            }
            options.sort_by_key(|(r, _)| *r);
            tasks.push(Task {
                name: t.name.clone(),
                options,
            });
        }

        let mut dependencies = Vec::with_capacity(spec.dependencies.len());
        for d in &spec.dependencies {
            let lookup = |name: &str| {
                task_index
                    .get(name)
                    .copied()
                    .ok_or_else(|| ApspError::UnknownTask(name.to_string()))
            };
            dependencies.push(Dependency {
                from: lookup(&d.from)?,
                to: lookup(&d.to)?,
                tokens: d.tokens,
            });
        }

        // Both orientations of every pair sharing a resource.
        let mut overlaps = Vec::new();
        for i in 0..tasks.len() {
            for j in (i + 1)..tasks.len() {
                let shared: Vec<usize> = tasks[i]
                    .options
                    .iter()
                    .filter(|(r, _)| tasks[j].duration(*r).is_some())
                    .map(|(r, _)| *r)
                    .collect();
                if !shared.is_empty() {
                    overlaps.push(Overlap {
                        first: i,
                        second: j,
                        resources: shared.clone(),
                    });
                    overlaps.push(Overlap {
                        first: j,
                        second: i,
                        resources: shared,
                    });
                }
            }
        }

        let bound = spec.resources.len() + tasks.len();
        let period_ub: f64 = tasks.iter().map(Task::max_duration).sum();
        let max_duration = tasks.iter().map(Task::max_duration).fold(0.0, f64::max);
        // An inactive no-overlap row has to absorb start differences of up to
        // `bound·period_ub` plus an offset shift of up to `bound·period_ub`.
        let big_m = max_duration * tasks.len() as f64 * bound as f64
            + 2.0 * (bound + 1) as f64 * period_ub;

        Ok(Self {
            name: spec.name,
            resources: spec.resources,
            tasks,
            dependencies,
            overlaps,
            bound,
            period_ub,
            big_m,
        })
    }

    /// Parse and validate a JSON instance.
    pub fn from_json_str(json: &str) -> ApspResult<Self> {
        let spec: InstanceSpec = serde_json::from_str(json)?;
        Self::from_spec(spec)
    }

    /// Load an instance file. An empty name is replaced by the file stem.
    ///
    /// Files ending in `.xml` are read as SDF3 graphs with their names kept.
    pub fn from_path(path: impl AsRef<Path>) -> ApspResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut spec = if path.extension().is_some_and(|ext| ext == "xml") {
            from_sdf3_str(&text, &Sdf3Naming::Keep)?
        } else {
            serde_json::from_str::<InstanceSpec>(&text)?
        };
        if spec.name.is_empty() {
            spec.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        log::debug!("loaded instance {} from {}", spec.name, path.display());
        Self::from_spec(spec)
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource names.
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Tasks.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Dependencies.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Ordered task pairs sharing at least one resource.
    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }

    /// Number of resources plus number of tasks.
    ///
    /// Repetition offsets range over `0..=bound`.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Repetition offsets considered by the no-overlap rows.
    pub fn offsets(&self) -> RangeInclusive<usize> {
        0..=self.bound
    }

    /// Sum of each task's longest duration: a period every allocation achieves.
    pub fn period_ub(&self) -> f64 {
        self.period_ub
    }

    /// Big-M for the no-overlap rows.
    pub fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Index of the task called `name`.
    pub fn task_index(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }

    /// Number of tasks.
    pub fn num_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of resources.
    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = r#"{
        "name": "toy",
        "resources": ["r0", "r1"],
        "tasks": [
            {"name": "t0", "durations": {"r0": 2, "r1": 4}},
            {"name": "t1", "durations": {"r1": 3}}
        ],
        "dependencies": [{"from": "t0", "to": "t1", "tokens": 1}]
    }"#;

    #[test]
    fn test_derived_data() {
        let inst = ApspInstance::from_json_str(TOY).unwrap();
        assert_eq!(inst.name(), "toy");
        assert_eq!(inst.bound(), 4);
        assert_eq!(inst.offsets().count(), 5);
        assert_eq!(inst.period_ub(), 7.0);
        assert_eq!(inst.big_m(), 4.0 * 2.0 * 4.0 + 2.0 * 5.0 * 7.0);
        assert_eq!(inst.tasks()[0].options, vec![(0, 2.0), (1, 4.0)]);
        assert_eq!(
            inst.dependencies(),
            &[Dependency {
                from: 0,
                to: 1,
                tokens: 1
            }]
        );
    }

    #[test]
    fn test_overlaps_both_orientations() {
        let inst = ApspInstance::from_json_str(TOY).unwrap();
        let pairs: Vec<(usize, usize)> = inst
            .overlaps()
            .iter()
            .map(|o| (o.first, o.second))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
        assert!(inst.overlaps().iter().all(|o| o.resources == vec![1]));
    }

    #[test]
    fn test_rejects_unknown_names() {
        let bad_resource = TOY.replace("\"r1\": 3", "\"r9\": 3");
        assert!(matches!(
            ApspInstance::from_json_str(&bad_resource),
            Err(ApspError::UnknownResource { .. })
        ));

        let bad_task = TOY.replace("\"to\": \"t1\"", "\"to\": \"t7\"");
        assert!(matches!(
            ApspInstance::from_json_str(&bad_task),
            Err(ApspError::UnknownTask(name)) if name == "t7"
        ));
    }

    #[test]
    fn test_rejects_bad_tasks() {
        let no_resource = TOY.replace("{\"r1\": 3}", "{}");
        assert!(matches!(
            ApspInstance::from_json_str(&no_resource),
            Err(ApspError::InvalidInstance(_))
        ));

        let negative = TOY.replace("\"r0\": 2", "\"r0\": -2");
        assert!(matches!(
            ApspInstance::from_json_str(&negative),
            Err(ApspError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_zero_duration_flag() {
        let inst = ApspInstance::from_json_str(&TOY.replace("\"r0\": 2", "\"r0\": 0")).unwrap();
        assert!(inst.tasks()[0].has_zero_duration());
        assert!(!inst.tasks()[1].has_zero_duration());
    }
}
