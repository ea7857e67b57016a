//! Throughput-maximizing decomposition of the scheduling problem.
//!
//! Same instances as the period model, stated over normalized start times
//! `u = s / μ` and the throughput `τ = 1 / μ`. The master picks the
//! allocation `m` and integer repetition distances `K` between tasks that may
//! share a resource (`K[i,j] + K[j,i] = 1`) and maximizes a throughput
//! estimate `z`; cuts from the LP subproblem pull `z` down to the throughput
//! the chosen allocation can reach.

pub mod cuts;
pub mod layout;
pub mod master;
pub mod rows;
pub mod subproblems;

use std::sync::Arc;

use solver_lbbd::{BendersDecomposition, Components, MicrolpSolver, SolveOptions, Solver, Status};

use crate::error::ApspResult;
use crate::instance::ApspInstance;
use crate::settings::ApspSettings;

pub use cuts::ThroughputCuts;
pub use layout::ThroughputLayout;
pub use master::ThroughputMaster;
pub use rows::{ThroughputRow, ThroughputRowKind, ThroughputRows};
pub use subproblems::{ThroughputAuxiliary, ThroughputDual, ThroughputPrimal};

/// Master, dual, auxiliary and primal adapters plus the cut generator for `instance`.
pub fn build_throughput_components(
    instance: Arc<ApspInstance>,
    settings: &ApspSettings,
) -> ApspResult<Components> {
    let master = ThroughputMaster::new(&instance, settings.master.clone())?;
    let rows = Arc::new(ThroughputRows::new(&instance, master.layout()));
    let cuts = ThroughputCuts::new(rows.clone(), master.throughput());

    let dual = ThroughputDual::new(instance.clone(), rows.clone(), settings.dual.clone());
    let primal = ThroughputPrimal::new(instance.clone(), rows.clone(), settings.primal.clone());

    let mut components = Components::new(Box::new(master), Box::new(dual), Box::new(cuts))
        .with_primal(Box::new(primal));
    if settings.stabilized {
        components = components.with_auxiliary(Box::new(ThroughputAuxiliary::new(
            instance,
            rows,
            settings.auxiliary.clone(),
            settings.optimality_tol,
        )));
    }
    Ok(components)
}

/// A throughput decomposition bound to one instance.
pub struct ThroughputBenders<S: Solver = MicrolpSolver> {
    instance: Arc<ApspInstance>,
    settings: ApspSettings,
    lbbd: BendersDecomposition<S>,
}

impl ThroughputBenders<MicrolpSolver> {
    /// Decomposition solved with the bundled backend.
    pub fn new(instance: ApspInstance, settings: ApspSettings) -> ApspResult<Self> {
        Self::with_solver(instance, settings, MicrolpSolver::new())
    }
}

impl<S: Solver> ThroughputBenders<S> {
    /// Decomposition solved with `solver`.
    pub fn with_solver(instance: ApspInstance, settings: ApspSettings, solver: S) -> ApspResult<Self> {
        let instance = Arc::new(instance);
        let components = build_throughput_components(instance.clone(), &settings)?;
        let lbbd = BendersDecomposition::new(
            format!("{}_throughput", instance.name()),
            components,
            solver,
            settings.lbbd.clone(),
        );
        Ok(Self {
            instance,
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
            "{} (throughput): {} after {} iterations",
            self.instance.name(),
            status,
            self.lbbd.history().len()
        );
        status
    }

    /// Best throughput found (the lower bound).
    pub fn throughput(&self) -> f64 {
        self.lbbd.objective()
    }

    /// Period matching [`throughput`](Self::throughput); None while no positive throughput is known.
    pub fn period(&self) -> Option<f64> {
        let t = self.throughput();
        (t.is_finite() && t > 0.0).then(|| 1.0 / t)
    }

    /// Instance.
    pub fn instance(&self) -> &ApspInstance {
        &self.instance
    }

    /// Underlying decomposition.
    pub fn decomposition(&self) -> &BendersDecomposition<S> {
        &self.lbbd
    }

    /// Underlying decomposition, mutably.
    pub fn decomposition_mut(&mut self) -> &mut BendersDecomposition<S> {
        &mut self.lbbd
    }
}
