//! `solve` and `benchmark` subcommands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use serde::Serialize;

use solver_apsp::{ApspBenders, ApspInstance, ApspSettings, MonolithicModel, ThroughputBenders};
use solver_lbbd::{LogVerbosity, MicrolpSolver, SolveOptions, SolverConfig, Status};

/// Options shared by both subcommands.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub settings_file: Option<PathBuf>,
    pub iterations: Option<usize>,
    pub epsilon: Option<f64>,
    /// Seconds.
    pub time_limit: Option<f64>,
    pub verbosity: u8,
    pub stabilized: bool,
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Settings file (if any) with the command-line overrides applied.
    pub fn settings(&self) -> anyhow::Result<ApspSettings> {
        let mut settings = match &self.settings_file {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading settings {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing settings {}", path.display()))?
            }
            None => ApspSettings::default(),
        };
        if let Some(n) = self.iterations {
            settings.lbbd.max_iterations = n;
        }
        if let Some(eps) = self.epsilon {
            settings.lbbd.epsilon = eps;
        }
        if let Some(secs) = self.time_limit {
            if !secs.is_finite() || secs < 0.0 {
                bail!("time limit must be a non-negative number of seconds, got {}", secs);
            }
            settings.lbbd.time_limit_ms = Some((secs * 1000.0).round() as u64);
        }
        if self.verbosity > 0 {
            settings.lbbd.verbosity = LogVerbosity::from_level(self.verbosity);
        }
        if !self.stabilized {
            settings.stabilized = false;
        }
        Ok(settings)
    }
}

/// One line of the benchmark summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub status: String,
    /// None when no finite bound was reached.
    pub objective: Option<f64>,
    /// Seconds.
    pub solve_time: f64,
    pub iterations: usize,
    pub cuts: usize,
    /// Load or export failure, if any.
    pub error: Option<String>,
}

impl RunSummary {
    fn failed(name: String, error: &anyhow::Error) -> Self {
        Self {
            name,
            status: String::from("not solved"),
            objective: None,
            solve_time: 0.0,
            iterations: 0,
            cuts: 0,
            error: Some(format!("{:#}", error)),
        }
    }
}

/// Solve a loaded instance and export results under `output`.
fn run_instance(
    instance: ApspInstance,
    settings: ApspSettings,
    output: Option<&Path>,
) -> anyhow::Result<(ApspBenders, RunSummary)> {
    let name = instance.name().to_string();
    let mut options = SolveOptions::from_settings(&settings.lbbd);
    if let Some(dir) = output {
        options = options.with_log_destination(dir, name.as_str());
    }

    let mut benders = ApspBenders::new(instance, settings)?;
    let status = benders.solve_with(options);
    let lbbd = benders.decomposition();
    let objective = lbbd.objective();
    let iterations = match status {
        Status::Optimal => lbbd.iteration_count(),
        _ => lbbd.history().len(),
    };
    let summary = RunSummary {
        name: name.clone(),
        status: status.to_string(),
        objective: objective.is_finite().then_some(objective),
        solve_time: lbbd.solve_time().as_secs_f64(),
        iterations,
        cuts: lbbd.cut_log().len(),
        error: None,
    };

    if let Some(dir) = output {
        if benders.decomposition().incumbent().is_some() {
            benders
                .decomposition_mut()
                .write_solution(dir, &name)
                .with_context(|| format!("writing solution of {}", name))?;
        } else if status != Status::SolverError {
            // Solver errors already wrote their log through the destination.
            benders
                .decomposition_mut()
                .write_error_log(dir, &name)
                .with_context(|| format!("writing error log of {}", name))?;
        }
    }
    Ok((benders, summary))
}

/// Extra models `solve` runs next to the decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compare {
    pub monolithic: bool,
    pub throughput: bool,
    pub schedule: bool,
}

/// `solve <instance>`.
pub fn solve(path: &Path, config: &RunConfig, compare: Compare) -> anyhow::Result<()> {
    let Compare {
        monolithic,
        throughput,
        schedule,
    } = compare;
    let instance = ApspInstance::from_path(path)
        .with_context(|| format!("loading instance {}", path.display()))?;
    let settings = config.settings()?;
    log::info!(
        "{}: {} tasks, {} resources, {} dependencies",
        instance.name(),
        instance.num_tasks(),
        instance.num_resources(),
        instance.dependencies().len()
    );

    let reference = instance.clone();
    let time_limit = settings.lbbd.time_limit_ms.map(Duration::from_millis);
    let repetitions = settings.repetitions;
    let (benders, summary) = run_instance(instance, settings, config.output.as_deref())?;

    println!("Instance:         {}", summary.name);
    println!("Status:           {}", summary.status);
    match summary.objective {
        Some(obj) => println!("Period:           {:.6}", obj),
        None => println!("Period:           -"),
    }
    println!("Iterations:       {}", summary.iterations);
    println!("Cuts:             {}", summary.cuts);
    println!("Solve time:       {:.3} s", summary.solve_time);

    if schedule {
        match benders.schedule() {
            Ok(s) => print!("\n{}", s),
            Err(e) => log::warn!("{}: no schedule: {}", summary.name, e),
        }
    }

    if throughput {
        let mut tp = ThroughputBenders::new(reference.clone(), config.settings()?)?;
        let status = tp.solve();
        println!();
        println!("Throughput:       {}", status);
        match tp.period() {
            Some(p) => println!("Period:           {:.6}", p),
            None => println!("Period:           -"),
        }
        println!("Solve time:       {:.3} s", tp.decomposition().solve_time().as_secs_f64());
        if let (Some(a), Some(b)) = (summary.objective, tp.period()) {
            if status == Status::Optimal && (a - b).abs() > 1e-4 * a.abs().max(1.0) {
                log::warn!("{}: period {} vs throughput period {}", summary.name, a, b);
            }
        }
    }

    if monolithic {
        let start = Instant::now();
        let model = MonolithicModel::new(&reference, SolverConfig::named("monolithic"))?;
        let sol = model.solve(&mut MicrolpSolver::new(), &reference, time_limit, repetitions)?;
        println!();
        println!("Monolithic:       {}", sol.status);
        match sol.period {
            Some(p) => println!("Period:           {:.6}", p),
            None => println!("Period:           -"),
        }
        println!("Solve time:       {:.3} s", start.elapsed().as_secs_f64());
        if let (Some(a), Some(b)) = (summary.objective, sol.period) {
            if (a - b).abs() > 1e-6 * a.abs().max(1.0) {
                log::warn!("{}: decomposition {} vs monolithic {}", summary.name, a, b);
            }
        }
    }
    Ok(())
}

/// `benchmark <dir>`: solve every `*.json` and `*.xml` instance in `dir`.
pub fn benchmark(
    dir: &Path,
    config: &RunConfig,
    summary_path: Option<&Path>,
) -> anyhow::Result<Vec<RunSummary>> {
    let settings = config.settings()?;
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json" || ext == "xml"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("no *.json or *.xml instances in {}", dir.display());
    }

    if let Some(out) = &config.output {
        fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    }

    let mut results = Vec::with_capacity(paths.len());
    for path in &paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = ApspInstance::from_path(path)
            .with_context(|| format!("loading instance {}", path.display()))
            .and_then(|inst| run_instance(inst, settings.clone(), config.output.as_deref()));
        let summary = match result {
            Ok((_, summary)) => summary,
            Err(e) => {
                log::error!("{}: {:#}", stem, e);
                RunSummary::failed(stem, &e)
            }
        };
        log::info!(
            "{:<24} {:<26} {:>12} {:>8.3}s {:>5} it",
            summary.name,
            summary.status,
            summary
                .objective
                .map_or_else(|| String::from("-"), |o| format!("{:.4}", o)),
            summary.solve_time,
            summary.iterations
        );
        results.push(summary);
    }

    let target = summary_path
        .map(Path::to_path_buf)
        .or_else(|| config.output.as_ref().map(|o| o.join("summary.json")));
    if let Some(target) = target {
        let json = serde_json::to_string_pretty(&results)?;
        fs::write(&target, json).with_context(|| format!("writing {}", target.display()))?;
        log::info!("summary written to {}", target.display());
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = include_str!("../../solver-apsp/instances/toy.json");

    fn config(output: Option<PathBuf>) -> RunConfig {
        RunConfig {
            iterations: Some(20),
            stabilized: true,
            output,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_settings_overrides() {
        let cfg = RunConfig {
            iterations: Some(5),
            epsilon: Some(1e-3),
            time_limit: Some(1.5),
            verbosity: 2,
            stabilized: false,
            ..RunConfig::default()
        };
        let s = cfg.settings().unwrap();
        assert_eq!(s.lbbd.max_iterations, 5);
        assert_eq!(s.lbbd.epsilon, 1e-3);
        assert_eq!(s.lbbd.time_limit_ms, Some(1500));
        assert_eq!(s.lbbd.verbosity, LogVerbosity::Steps);
        assert!(!s.stabilized);
    }

    #[test]
    fn test_settings_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"repetitions": 5, "lbbd": {"max_iterations": 9}}"#).unwrap();
        let cfg = RunConfig {
            settings_file: Some(path),
            epsilon: Some(0.5),
            stabilized: true,
            ..RunConfig::default()
        };
        let s = cfg.settings().unwrap();
        assert_eq!(s.repetitions, 5);
        assert_eq!(s.lbbd.max_iterations, 9);
        assert_eq!(s.lbbd.epsilon, 0.5);
        assert!(s.stabilized);
    }

    #[test]
    fn test_negative_time_limit_rejected() {
        let cfg = RunConfig {
            time_limit: Some(-1.0),
            ..RunConfig::default()
        };
        assert!(cfg.settings().is_err());
    }

    #[test]
    fn test_benchmark_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("toy.json"), TOY).unwrap();
        fs::write(input.path().join("broken.json"), "{").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let results =
            benchmark(input.path(), &config(Some(output.path().to_path_buf())), None).unwrap();
        assert_eq!(results.len(), 2);

        let broken = &results[0];
        assert_eq!(broken.name, "broken");
        assert!(broken.error.is_some());

        let toy = &results[1];
        assert_eq!(toy.status, "optimal solution");
        assert!((toy.objective.unwrap() - 3.0).abs() < 1e-6);
        assert!(output.path().join("toy_primal_sub.json").exists());

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(output.path().join("summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.as_array().unwrap().len(), 2);
        assert_eq!(summary[1]["name"], "toy");
    }

    #[test]
    fn test_solve_with_comparisons() {
        let input = tempfile::tempdir().unwrap();
        let path = input.path().join("toy.json");
        fs::write(&path, TOY).unwrap();
        let compare = Compare {
            monolithic: true,
            throughput: true,
            schedule: true,
        };
        solve(&path, &config(None), compare).unwrap();
        assert!(solve(&input.path().join("missing.json"), &config(None), compare).is_err());
    }

    #[test]
    fn test_benchmark_empty_directory() {
        let input = tempfile::tempdir().unwrap();
        assert!(benchmark(input.path(), &config(None), None).is_err());
    }

    #[test]
    fn test_iteration_cap_writes_solution() {
        let output = tempfile::tempdir().unwrap();
        let inst = ApspInstance::from_json_str(TOY).unwrap();
        let mut settings = ApspSettings::default();
        settings.lbbd.max_iterations = 1;
        let (_, summary) = run_instance(inst, settings, Some(output.path())).unwrap();
        assert_eq!(summary.status, "iteration limit exceeded");
        assert_eq!(summary.iterations, 1);
        assert!(output.path().join("toy_master.json").exists());
    }
}
