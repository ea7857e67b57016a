//! The Benders iteration loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::clock::SolveClock;
use super::export::{
    write_model_export, DiagnosticReport, DiagnosticSink, FileDiagnostics, LogDiagnostics,
};
use crate::adapter::{Components, SubproblemInput};
use crate::backend::Solver;
use crate::bounds::{BoundTracker, Bounds, Incumbent, ModelSnapshot};
use crate::core_point::CorePointTracker;
use crate::cuts::CutLog;
use crate::error::{FailureReason, LbbdError, LbbdResult};
use crate::model::{BackendStatus, LinearModel, SolveOutcome};
use crate::point::{CorePoint, TrialPoint};
use crate::settings::{LbbdSettings, LogVerbosity, SolveOptions};
use crate::status::{Stage, Status};

/// Per-iteration progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// Iteration index.
    pub iteration: usize,

    /// Lower bound after the iteration.
    pub lower_bound: f64,

    /// Upper bound after the iteration.
    pub upper_bound: f64,

    /// Master objective.
    pub master_objective: f64,

    /// Dual subproblem objective.
    pub dual_objective: f64,

    /// Master constraint count when it was solved.
    pub master_constraints: usize,

    /// Seconds since the run started.
    pub elapsed_secs: f64,
}

/// Logic-based Benders decomposition with Magnanti-Wong-Papadakos stabilization.
pub struct BendersDecomposition<S: Solver> {
    name: String,
    solver: S,
    components: Components,
    settings: LbbdSettings,
    diagnostics: Option<Box<dyn DiagnosticSink>>,

    verbosity: LogVerbosity,
    status: Status,
    bounds: BoundTracker,
    core: CorePointTracker,
    cut_log: CutLog,
    history: Vec<IterationRecord>,
    iteration: Option<usize>,
    iteration_count: usize,
    solve_time: Duration,

    last_master: Option<SolveOutcome>,
    last_trial: Option<TrialPoint>,
    last_dual: Option<ModelSnapshot>,
    last_aux: Option<ModelSnapshot>,
}

impl<S: Solver> BendersDecomposition<S> {
    /// Create a decomposition over `components` solved with `solver`.
    pub fn new(
        name: impl Into<String>,
        components: Components,
        solver: S,
        settings: LbbdSettings,
    ) -> Self {
        let sense = components.master.model().sense();
        let core = CorePointTracker::new(settings.proxy_blend);
        Self {
            name: name.into(),
            solver,
            components,
            diagnostics: None,
            verbosity: settings.verbosity,
            status: Status::Running,
            bounds: BoundTracker::new(sense),
            core,
            cut_log: CutLog::new(),
            history: Vec::new(),
            iteration: None,
            iteration_count: 0,
            solve_time: Duration::ZERO,
            last_master: None,
            last_trial: None,
            last_dual: None,
            last_aux: None,
            settings,
        }
    }

    /// Set the iteration cap.
    pub fn set_iterations(&mut self, iterations: usize) {
        self.settings.max_iterations = iterations;
    }

    /// Replace the sink used on the failure path.
    ///
    /// Without one, reports go to files when the solve options name a log
    /// destination and to the log otherwise.
    pub fn set_diagnostics(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.diagnostics = Some(sink);
    }

    /// Run the decomposition.
    ///
    /// Never panics and never returns an error: every failure ends up in the
    /// returned status, with bounds and incumbent left as they were.
    pub fn solve(&mut self, options: SolveOptions) -> Status {
        self.reset_run();
        self.verbosity = options.effective_verbosity();
        let clock = SolveClock::start(options.time_limit);

        let result = match catch_unwind(AssertUnwindSafe(|| self.run(&clock))) {
            Ok(result) => result,
            Err(payload) => Err(LbbdError::Panic(panic_text(payload))),
        };

        if let Err(err) = result {
            match err.reason() {
                FailureReason::Timeout => {
                    log::warn!("{}: time limit exceeded", self.name);
                    self.status = Status::TimeLimit;
                }
                FailureReason::SolverFault => {
                    log::warn!("{}: {}", self.name, err);
                    self.status = Status::SolverError;
                    self.export_diagnostics(&options, &err);
                }
                FailureReason::Unclassified => {
                    log::error!("{}: error during solve: {}", self.name, err);
                    self.export_diagnostics(&options, &err);
                }
            }
        }

        self.solve_time = clock.elapsed();
        self.status.clone()
    }

    fn reset_run(&mut self) {
        self.status = Status::Running;
        self.bounds = BoundTracker::new(self.components.master.model().sense());
        self.core.reset();
        self.history.clear();
        self.iteration = None;
        self.iteration_count = 0;
        self.last_master = None;
        self.last_trial = None;
        self.last_dual = None;
        self.last_aux = None;
    }

    fn run(&mut self, clock: &SolveClock) -> LbbdResult<()> {
        let floor = self.settings.min_solve_time();

        for k in 0..self.settings.max_iterations {
            clock.check()?;
            self.iteration = Some(k);
            self.banner(k, "BENDERS");

            if k > 0 {
                self.apply_cut(k)?;
            }

            // Master
            self.banner(k, "Master");
            let master_rows = self.components.master.model().num_constraints();
            let master_out = self
                .solver
                .solve(self.components.master.model(), clock.solve_limit(floor))?;
            self.status = Status::step(Stage::Master, master_out.status);
            let master = self.last_master.insert(master_out);
            let Some(master_obj) = master.objective else {
                return Err(missing_solution(clock, Stage::Master, master.status));
            };
            let trial = self.components.master.extract_trial_point(master)?;
            self.last_trial = Some(trial.clone());

            // Dual subproblem
            self.banner(k, "Sub");
            clock.check()?;
            let dual_model = Arc::new(self.components.dual.build(&SubproblemInput::new(&trial))?);
            let dual_out = self.solver.solve(&dual_model, clock.solve_limit(floor))?;
            self.status = Status::step(Stage::Dual, dual_out.status);
            let (dual_obj, dual_status) = (dual_out.objective, dual_out.status);
            self.last_dual = Some(ModelSnapshot::new(dual_model, Some(dual_out)));
            let dual_obj =
                dual_obj.ok_or_else(|| missing_solution(clock, Stage::Dual, dual_status))?;

            let core = self.core.update(&trial, k)?.clone();

            // Auxiliary subproblem
            self.solve_auxiliary(k, clock, &trial, &core, dual_obj)?;

            if self.bounds.update(master_obj, dual_obj) {
                self.record_incumbent(k, dual_obj, trial);
            }

            self.history.push(IterationRecord {
                iteration: k,
                lower_bound: self.bounds.lower(),
                upper_bound: self.bounds.upper(),
                master_objective: master_obj,
                dual_objective: dual_obj,
                master_constraints: master_rows,
                elapsed_secs: clock.elapsed().as_secs_f64(),
            });

            let converged = self.bounds.converged(self.settings.epsilon);
            if self.verbosity >= LogVerbosity::Iterations {
                log::info!("Iteration: {}", k);
                log::info!("Elapsed time: {:.2} seconds", clock.elapsed().as_secs_f64());
                log::info!("Upperbound: {}", self.bounds.upper());
                log::info!("Lowerbound: {}", self.bounds.lower());
                log::info!("Completion: {}", converged);
            }

            clock.check()?;

            if converged {
                self.status = Status::Optimal;
                self.iteration_count = k;
                return Ok(());
            }
        }

        self.status = Status::IterationLimit;
        Ok(())
    }

    fn solve_auxiliary(
        &mut self,
        k: usize,
        clock: &SolveClock,
        trial: &TrialPoint,
        core: &CorePoint,
        dual_obj: f64,
    ) -> LbbdResult<()> {
        let Some(aux) = &self.components.auxiliary else {
            return Ok(());
        };
        self.banner(k, "Magnanti Sub");
        clock.check()?;

        let input = SubproblemInput::new(trial).with_stabilization(core, dual_obj);
        let aux_model = Arc::new(aux.build(&input)?);
        let aux_out = self
            .solver
            .solve(&aux_model, clock.solve_limit(self.settings.min_solve_time()))?;
        self.status = Status::step(Stage::Auxiliary, aux_out.status);
        let (solved, aux_status) = (aux_out.has_solution(), aux_out.status);
        self.last_aux = Some(ModelSnapshot::new(aux_model, Some(aux_out)));
        if solved {
            Ok(())
        } else {
            Err(missing_solution(clock, Stage::Auxiliary, aux_status))
        }
    }

    fn apply_cut(&mut self, k: usize) -> LbbdResult<()> {
        self.banner(k, "Adding cuts to");
        let source = self.components.cut_source();
        let snapshot = if self.components.auxiliary.is_some() {
            self.last_aux.as_ref()
        } else {
            self.last_dual.as_ref()
        };
        let multipliers = snapshot
            .and_then(|s| s.outcome.as_ref())
            .filter(|o| o.has_solution())
            .ok_or_else(|| {
                LbbdError::InvalidPoint(format!("no multipliers available for cut {}", k))
            })?;

        let cut = self.components.cuts.generate(multipliers, source, k)?;
        let row = self.components.master.add_cut(&cut)?;
        if self.cut_log.record(cut, row) {
            log::warn!("{}: cut {} repeats an earlier cut", self.name, k);
        }
        Ok(())
    }

    fn record_incumbent(&mut self, k: usize, objective: f64, trial: TrialPoint) {
        let master = ModelSnapshot::new(
            Arc::new(self.components.master.model().clone()),
            self.last_master.clone(),
        );
        let dual = match &self.last_dual {
            Some(d) => d.clone(),
            None => return,
        };
        self.bounds.record(Incumbent {
            iteration: k,
            objective,
            trial,
            master,
            dual,
        });
    }

    fn banner(&self, k: usize, label: &str) {
        if self.verbosity >= LogVerbosity::Steps {
            log::info!("{} {} ITERATION {} {}", label, self.name, k, "_".repeat(40));
        }
    }

    fn export_diagnostics(&mut self, options: &SolveOptions, err: &LbbdError) {
        let report = self.diagnostic_report(Some(err));
        let result = match (&mut self.diagnostics, &options.log_destination) {
            (Some(sink), _) => sink.export(&report),
            (None, Some(dir)) => FileDiagnostics::new(dir, &options.log_file_name).export(&report),
            (None, None) => LogDiagnostics.export(&report),
        };
        if let Err(e) = result {
            log::error!("{}: diagnostic export failed: {}", self.name, e);
        }
    }

    /// Snapshot the current state for diagnostics (best effort).
    pub fn diagnostic_report(&mut self, error: Option<&LbbdError>) -> DiagnosticReport {
        let master_model = self.components.master.model().clone();

        let conflict = match &self.last_master {
            Some(out) if !out.has_solution() => {
                let limit = master_model.config().conflict_time_limit();
                match self.solver.explain_infeasibility(&master_model, limit) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        log::warn!("{}: conflict diagnosis failed: {}", self.name, e);
                        None
                    }
                }
            }
            _ => None,
        };

        let primal = self.resolve_primal().ok().flatten();

        DiagnosticReport {
            name: self.name.clone(),
            status: self.status.clone(),
            error: error.map(|e| e.to_string()),
            iteration: self.iteration,
            bounds: self.bounds.bounds(),
            master: ModelSnapshot::new(Arc::new(master_model), self.last_master.clone()),
            dual: self.last_dual.clone(),
            auxiliary: self.last_aux.clone(),
            primal,
            conflict,
        }
    }

    /// Rebuild and solve the primal subproblem at the best trial point.
    fn resolve_primal(&mut self) -> LbbdResult<Option<ModelSnapshot>> {
        let trial = match (self.bounds.incumbent(), &self.last_trial) {
            (Some(inc), _) => inc.trial.clone(),
            (None, Some(t)) => t.clone(),
            (None, None) => return Ok(None),
        };
        let Some(primal) = &self.components.primal else {
            return Ok(None);
        };
        let model = Arc::new(primal.build(&SubproblemInput::new(&trial))?);
        let outcome = self.solver.solve(&model, None)?;
        Ok(Some(ModelSnapshot::new(model, Some(outcome))))
    }

    /// Write the best solution as `<filename>_master`, `_sub`, `_aux` and `_primal_sub`.
    pub fn write_solution(&mut self, destination: impl AsRef<Path>, filename: &str) -> LbbdResult<()> {
        let dir = destination.as_ref();
        let incumbent = self.bounds.incumbent().ok_or(LbbdError::NoIncumbent)?;
        write_model_export(dir, &format!("{}_master", filename), &incumbent.master)?;
        write_model_export(dir, &format!("{}_sub", filename), &incumbent.dual)?;
        if let Some(aux) = &self.last_aux {
            write_model_export(dir, &format!("{}_aux", filename), aux)?;
        }
        if let Some(primal) = self.resolve_primal()? {
            write_model_export(dir, &format!("{}_primal_sub", filename), &primal)?;
        }
        Ok(())
    }

    /// Write whatever state exists under `<destination>/error_log/`.
    pub fn write_error_log(&mut self, destination: impl AsRef<Path>, filename: &str) -> LbbdResult<()> {
        let report = self.diagnostic_report(None);
        FileDiagnostics::new(destination.as_ref(), filename).export(&report)
    }

    /// Decomposition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Status after the last step.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Best proven objective. Only meaningful when the status is optimal.
    pub fn objective(&self) -> f64 {
        self.bounds.objective()
    }

    /// Wall-clock time of the last `solve` call.
    pub fn solve_time(&self) -> Duration {
        self.solve_time
    }

    /// Iteration at which the run converged. Only meaningful when optimal.
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Last iteration index reached.
    pub fn iteration(&self) -> Option<usize> {
        self.iteration
    }

    /// Current bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds.bounds()
    }

    /// Best incumbent snapshot.
    pub fn incumbent(&self) -> Option<&Incumbent> {
        self.bounds.incumbent()
    }

    /// Per-iteration history of the last run.
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// All cuts added to the master.
    pub fn cut_log(&self) -> &CutLog {
        &self.cut_log
    }

    /// Core point after the last update.
    pub fn core_point(&self) -> Option<&CorePoint> {
        self.core.current()
    }

    /// Master model.
    pub fn master_model(&self) -> &LinearModel {
        self.components.master.model()
    }

    /// Settings.
    pub fn settings(&self) -> &LbbdSettings {
        &self.settings
    }

    /// Backend.
    pub fn solver(&self) -> &S {
        &self.solver
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// A stage came back without a solution. Running out of time is reported as such.
fn missing_solution(clock: &SolveClock, stage: Stage, status: BackendStatus) -> LbbdError {
    if status == BackendStatus::TimeLimit || clock.check().is_err() {
        LbbdError::TimeLimit
    } else {
        LbbdError::MissingSolution { stage, status }
    }
}
