//! Solution exports and failure diagnostics.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backend::Conflict;
use crate::bounds::{Bounds, ModelSnapshot};
use crate::error::LbbdResult;
use crate::model::{to_lp_string, BackendStatus};
use crate::status::Status;

#[derive(Serialize)]
struct VariableRecord<'a> {
    name: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct SolutionRecord<'a> {
    model: &'a str,
    status: BackendStatus,
    objective: f64,
    variables: Vec<VariableRecord<'a>>,
}

/// Write `<dir>/<file_name>.txt`, `.lp` and (with a solution) `.json` for a model.
pub fn write_model_export(dir: &Path, file_name: &str, snapshot: &ModelSnapshot) -> LbbdResult<()> {
    fs::create_dir_all(dir)?;
    let model = &snapshot.model;

    let mut txt = format!("solution for: {}\n", model.name());
    match &snapshot.outcome {
        Some(out) => {
            match out.objective {
                Some(obj) => txt.push_str(&format!("objective: {}\n", obj)),
                None => txt.push_str("objective: none\n"),
            }
            txt.push_str(&format!("status: {}\n", out.status));
            for (var, value) in model.variables().iter().zip(&out.values) {
                if *value != 0.0 {
                    txt.push_str(&format!("{} = {}\n", var.name, value));
                }
            }
        }
        None => txt.push_str("objective: none\nstatus: not solved\n"),
    }
    fs::write(dir.join(format!("{}.txt", file_name)), txt)?;

    fs::write(dir.join(format!("{}.lp", file_name)), to_lp_string(model))?;

    if let Some(out) = &snapshot.outcome {
        if let Some(objective) = out.objective {
            let record = SolutionRecord {
                model: model.name(),
                status: out.status,
                objective,
                variables: model
                    .variables()
                    .iter()
                    .zip(&out.values)
                    .map(|(v, &value)| VariableRecord {
                        name: &v.name,
                        value,
                    })
                    .collect(),
            };
            let file = fs::File::create(dir.join(format!("{}.json", file_name)))?;
            serde_json::to_writer_pretty(file, &record)?;
        }
    }
    Ok(())
}

/// State of a decomposition captured on the failure path.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    /// Decomposition name.
    pub name: String,

    /// Status when the run stopped.
    pub status: Status,

    /// Error that stopped the run, if any.
    pub error: Option<String>,

    /// Last iteration reached.
    pub iteration: Option<usize>,

    /// Bounds at abort time.
    pub bounds: Bounds,

    /// Master model and its last outcome.
    pub master: ModelSnapshot,

    /// Last dual subproblem.
    pub dual: Option<ModelSnapshot>,

    /// Last auxiliary subproblem.
    pub auxiliary: Option<ModelSnapshot>,

    /// Primal subproblem re-solved at the best known trial point.
    pub primal: Option<ModelSnapshot>,

    /// Infeasibility explanation of the master, when it had no solution.
    pub conflict: Option<Conflict>,
}

impl DiagnosticReport {
    /// Short multi-line summary.
    pub fn summary(&self) -> String {
        let mut s = format!("decomposition: {}\nstatus: {}\n", self.name, self.status);
        if let Some(err) = &self.error {
            s.push_str(&format!("error: {}\n", err));
        }
        match self.iteration {
            Some(k) => s.push_str(&format!("iteration: {}\n", k)),
            None => s.push_str("iteration: none\n"),
        }
        s.push_str(&format!(
            "upper bound: {}\nlower bound: {}\n",
            self.bounds.upper, self.bounds.lower
        ));
        s
    }
}

/// Receiver of diagnostic reports.
pub trait DiagnosticSink {
    /// Export one report.
    fn export(&mut self, report: &DiagnosticReport) -> LbbdResult<()>;
}

/// Writes reports under `<destination>/error_log/`.
#[derive(Debug, Clone)]
pub struct FileDiagnostics {
    destination: PathBuf,
    file_name: String,
}

impl FileDiagnostics {
    /// Sink writing `<destination>/error_log/<file_name>_*_ERRORLOG.*`.
    pub fn new(destination: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            file_name: file_name.into(),
        }
    }

    /// Directory the files go to.
    pub fn dir(&self) -> PathBuf {
        self.destination.join("error_log")
    }
}

impl DiagnosticSink for FileDiagnostics {
    fn export(&mut self, report: &DiagnosticReport) -> LbbdResult<()> {
        let dir = self.dir();
        fs::create_dir_all(&dir)?;
        let base = &self.file_name;

        fs::write(dir.join(format!("{}_ERRORLOG.txt", base)), report.summary())?;
        write_model_export(&dir, &format!("{}_master_ERRORLOG", base), &report.master)?;
        if let Some(dual) = &report.dual {
            write_model_export(&dir, &format!("{}_sub_ERRORLOG", base), dual)?;
        }
        if let Some(aux) = &report.auxiliary {
            write_model_export(&dir, &format!("{}_aux_ERRORLOG", base), aux)?;
        }
        if let Some(primal) = &report.primal {
            write_model_export(&dir, &format!("{}_primal_sub_ERRORLOG", base), primal)?;
        }
        if let Some(conflict) = &report.conflict {
            fs::write(dir.join(format!("{}_conflict.txt", base)), conflict.to_string())?;
        }
        log::info!("error log for {} written to {}", report.name, dir.display());
        Ok(())
    }
}

/// Logs the report summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn export(&mut self, report: &DiagnosticReport) -> LbbdResult<()> {
        for line in report.summary().lines() {
            log::warn!("{}", line);
        }
        if let Some(conflict) = &report.conflict {
            for line in conflict.to_string().lines() {
                log::warn!("{}", line);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{
        ConstraintSense, LinearExpr, LinearModel, ObjectiveSense, SolveOutcome,
    };
    use crate::settings::SolverConfig;
    use crate::status::Stage;

    fn snapshot() -> ModelSnapshot {
        let mut m = LinearModel::new("demo", ObjectiveSense::Minimize, SolverConfig::default());
        let x = m.add_continuous("x", 0.0, 4.0);
        let y = m.add_binary("y");
        m.set_objective(LinearExpr::from(x) + LinearExpr::from(y)).unwrap();
        m.add_constraint("c", x, ConstraintSense::Ge, 1.5).unwrap();
        let out = SolveOutcome::solved(BackendStatus::Optimal, 1.5, vec![1.5, 0.0]);
        ModelSnapshot::new(Arc::new(m), Some(out))
    }

    #[test]
    fn test_model_export_files() {
        let dir = tempfile::tempdir().unwrap();
        write_model_export(dir.path(), "demo_master", &snapshot()).unwrap();

        let txt = fs::read_to_string(dir.path().join("demo_master.txt")).unwrap();
        assert!(txt.starts_with("solution for: demo\nobjective: 1.5\nstatus: optimal\n"));
        assert!(txt.contains("x = 1.5"));
        assert!(!txt.contains("y = "));

        let lp = fs::read_to_string(dir.path().join("demo_master.lp")).unwrap();
        assert!(lp.contains("Subject To"));

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("demo_master.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["objective"], 1.5);
        assert_eq!(json["variables"][0]["name"], "x");
    }

    #[test]
    fn test_unsolved_export_has_no_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut snap = snapshot();
        snap.outcome = Some(SolveOutcome::without_solution(BackendStatus::Infeasible));
        write_model_export(dir.path(), "inf", &snap).unwrap();
        assert!(dir.path().join("inf.lp").exists());
        assert!(!dir.path().join("inf.json").exists());
        let txt = fs::read_to_string(dir.path().join("inf.txt")).unwrap();
        assert!(txt.contains("status: infeasible"));
    }

    #[test]
    fn test_file_diagnostics_layout() {
        let dir = tempfile::tempdir().unwrap();
        let report = DiagnosticReport {
            name: "demo".into(),
            status: Status::step(Stage::Dual, BackendStatus::Infeasible),
            error: Some("dual sub problem returned no solution (status: infeasible)".into()),
            iteration: Some(2),
            bounds: Bounds {
                lower: 1.0,
                upper: 4.0,
            },
            master: snapshot(),
            dual: Some(snapshot()),
            auxiliary: None,
            primal: None,
            conflict: None,
        };
        let mut sink = FileDiagnostics::new(dir.path(), "run");
        sink.export(&report).unwrap();

        let log_dir = dir.path().join("error_log");
        assert!(log_dir.join("run_master_ERRORLOG.lp").exists());
        assert!(log_dir.join("run_sub_ERRORLOG.json").exists());
        assert!(!log_dir.join("run_aux_ERRORLOG.txt").exists());
        let summary = fs::read_to_string(log_dir.join("run_ERRORLOG.txt")).unwrap();
        assert!(summary.contains("status: dual sub problem infeasible"));
        assert!(summary.contains("iteration: 2"));
    }

    #[test]
    fn test_summary_text() {
        let report = DiagnosticReport {
            name: "demo".into(),
            status: Status::TimeLimit,
            error: None,
            iteration: None,
            bounds: Bounds {
                lower: f64::NEG_INFINITY,
                upper: f64::INFINITY,
            },
            master: snapshot(),
            dual: None,
            auxiliary: None,
            primal: None,
            conflict: None,
        };
        assert_eq!(
            report.summary(),
            "decomposition: demo\n\
             status: time limit exceeded\n\
             iteration: none\n\
             upper bound: inf\n\
             lower bound: -inf\n"
        );
    }
}
