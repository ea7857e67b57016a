//! Decomposition of a scheduling instance.

use std::sync::Arc;

use solver_lbbd::{
    BendersDecomposition, Components, MicrolpSolver, SolveOptions, Solver, Status,
    SubproblemAdapter, SubproblemInput,
};

use crate::cuts::ApspCuts;
use crate::dual::{ApspAuxiliary, ApspDual};
use crate::error::{ApspError, ApspResult};
use crate::instance::ApspInstance;
use crate::layout::DiscreteLayout;
use crate::master::ApspMaster;
use crate::primal::ApspPrimal;
use crate::rows::ScheduleRows;
use crate::schedule::Schedule;
use crate::settings::ApspSettings;

/// Master, dual, auxiliary and primal adapters plus the cut generator for `instance`.
pub fn build_components(
    instance: Arc<ApspInstance>,
    settings: &ApspSettings,
) -> ApspResult<Components> {
    let master = ApspMaster::new(&instance, settings.master.clone())?;
    let rows = Arc::new(ScheduleRows::new(&instance, master.layout()));
    let cuts = ApspCuts::new(rows.clone(), master.period());

    let dual = ApspDual::new(instance.clone(), rows.clone(), settings.dual.clone());
    let primal = ApspPrimal::new(instance.clone(), rows.clone(), settings.primal.clone());

    let mut components = Components::new(Box::new(master), Box::new(dual), Box::new(cuts))
        .with_primal(Box::new(primal));
    if settings.stabilized {
        components = components.with_auxiliary(Box::new(ApspAuxiliary::new(
            instance,
            rows,
            settings.auxiliary.clone(),
            settings.optimality_tol,
        )));
    }
    Ok(components)
}

/// A decomposition bound to one instance.
pub struct ApspBenders<S: Solver = MicrolpSolver> {
    instance: Arc<ApspInstance>,
    layout: DiscreteLayout,
    rows: Arc<ScheduleRows>,
    settings: ApspSettings,
    lbbd: BendersDecomposition<S>,
}

impl ApspBenders<MicrolpSolver> {
    /// Decomposition solved with the bundled backend.
    pub fn new(instance: ApspInstance, settings: ApspSettings) -> ApspResult<Self> {
        Self::with_solver(instance, settings, MicrolpSolver::new())
    }
}

impl<S: Solver> ApspBenders<S> {
    /// Decomposition solved with `solver`.
    pub fn with_solver(instance: ApspInstance, settings: ApspSettings, solver: S) -> ApspResult<Self> {
        let instance = Arc::new(instance);
        let layout = DiscreteLayout::new(&instance);
        let rows = Arc::new(ScheduleRows::new(&instance, &layout));
        let components = build_components(instance.clone(), &settings)?;
        let lbbd = BendersDecomposition::new(
            instance.name().to_string(),
            components,
            solver,
            settings.lbbd.clone(),
        );
        Ok(Self {
            instance,
            layout,
            rows,
            settings,
            lbbd,
        })
    }

    /// Solve with the options derived from the settings.
    pub fn solve(&mut self) -> Status {
        let options = SolveOptions::from_settings(&self.settings.lbbd);
        self.solve_with(options)
    }

    /// Solve with explicit options.
    pub fn solve_with(&mut self, options: SolveOptions) -> Status {
        let status = self.lbbd.solve(options);
        log::info!(
            "{}: {} after {} iterations",
            self.instance.name(),
            status,
            self.lbbd.history().len()
        );
        status
    }

    /// Schedule at the incumbent, from a fresh primal solve with `solver`.
    pub fn schedule_with<T: Solver>(&self, solver: &mut T) -> ApspResult<Schedule> {
        let incumbent = self
            .lbbd
            .incumbent()
            .ok_or_else(|| ApspError::NoSolution(format!("{} has no incumbent", self.instance.name())))?;
        let primal = ApspPrimal::new(
            self.instance.clone(),
            self.rows.clone(),
            self.settings.primal.clone(),
        );
        let model = primal.build(&SubproblemInput::new(&incumbent.trial))?;
        let out = solver.solve(&model, None)?;
        let Some(period) = out.value(primal.period()) else {
            return Err(ApspError::NoSolution(format!(
                "primal subproblem of {}: {}",
                self.instance.name(),
                out.status
            )));
        };
        let starts: Vec<f64> = (0..self.instance.num_tasks())
            .map(|a| out.value(ApspPrimal::start(a)).unwrap_or(0.0))
            .collect();
        Schedule::build(
            &self.instance,
            &self.layout,
            incumbent.trial.discrete(),
            &starts,
            period,
            self.settings.repetitions,
        )
    }

    /// Schedule at the incumbent, solved with the bundled backend.
    pub fn schedule(&self) -> ApspResult<Schedule> {
        self.schedule_with(&mut MicrolpSolver::new())
    }

    /// Instance.
    pub fn instance(&self) -> &ApspInstance {
        &self.instance
    }

    /// Settings.
    pub fn settings(&self) -> &ApspSettings {
        &self.settings
    }

    /// Underlying decomposition.
    pub fn decomposition(&self) -> &BendersDecomposition<S> {
        &self.lbbd
    }

    /// Underlying decomposition, mutably (iteration cap, diagnostics, exports).
    pub fn decomposition_mut(&mut self) -> &mut BendersDecomposition<S> {
        &mut self.lbbd
    }
}
