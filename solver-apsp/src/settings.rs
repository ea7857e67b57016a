//! Settings of the scheduling family.

use serde::{Deserialize, Serialize};

use solver_lbbd::{LbbdSettings, SolverConfig};

/// Settings for building and solving a scheduling decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApspSettings {
    // === Decomposition ===
    /// Controller settings.
    pub lbbd: LbbdSettings,

    /// Relative slack on the auxiliary optimality restriction.
    pub optimality_tol: f64,

    // === Models ===
    /// Master problem config.
    pub master: SolverConfig,

    /// Dual subproblem config.
    pub dual: SolverConfig,

    /// Auxiliary subproblem config.
    pub auxiliary: SolverConfig,

    /// Primal subproblem config.
    pub primal: SolverConfig,

    /// Use the auxiliary subproblem for cuts. Without it cuts come from the dual.
    pub stabilized: bool,

    // === Reporting ===
    /// Repetitions listed by schedule extraction.
    pub repetitions: usize,
}

impl Default for ApspSettings {
    fn default() -> Self {
        Self {
            lbbd: LbbdSettings::default(),
            optimality_tol: 1e-9,
            master: SolverConfig::named("master"),
            dual: SolverConfig::named("dual_sub"),
            auxiliary: SolverConfig::named("aux_sub"),
            primal: SolverConfig::named("primal_sub"),
            stabilized: true,
            repetitions: 3,
        }
    }
}

impl ApspSettings {
    /// Replace the controller settings.
    pub fn with_lbbd(mut self, lbbd: LbbdSettings) -> Self {
        self.lbbd = lbbd;
        self
    }

    /// Set the auxiliary optimality slack.
    pub fn with_optimality_tol(mut self, tol: f64) -> Self {
        self.optimality_tol = tol;
        self
    }

    /// Enable or disable the auxiliary subproblem.
    pub fn with_stabilization(mut self, stabilized: bool) -> Self {
        self.stabilized = stabilized;
        self
    }

    /// Set the number of repetitions in extracted schedules.
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Slack allowed below `dual_objective` in the auxiliary subproblem.
    pub fn optimality_slack(&self, dual_objective: f64) -> f64 {
        self.optimality_tol * dual_objective.abs().max(1.0)
    }
}
