//! Capability interfaces a problem family implements.
//!
//! A family supplies one [`MasterAdapter`], a dual [`SubproblemAdapter`], and
//! optionally a primal and an auxiliary one, plus a [`CutGenerator`]. The
//! controller only talks to these traits.

use crate::cuts::{BendersCut, CutSource};
use crate::error::LbbdResult;
use crate::model::{LinearModel, ObjectiveSense, SolveOutcome};
use crate::point::{CorePoint, TrialPoint};
use crate::settings::SolverConfig;

/// The master problem. Owns the only model that lives across iterations.
pub trait MasterAdapter {
    /// Current master model (base constraints plus all cuts so far).
    fn model(&self) -> &LinearModel;

    /// Mutable access for appending cuts.
    fn model_mut(&mut self) -> &mut LinearModel;

    /// Read the trial point from a master outcome.
    ///
    /// Discrete fields must be rounded to the nearest integer.
    fn extract_trial_point(&self, outcome: &SolveOutcome) -> LbbdResult<TrialPoint>;

    /// Append `cut` to the master, returning the new constraint index.
    fn add_cut(&mut self, cut: &BendersCut) -> LbbdResult<usize> {
        cut.add_to(self.model_mut())
    }
}

/// Data a subproblem is parameterized by.
#[derive(Debug, Clone, Copy)]
pub struct SubproblemInput<'a> {
    /// Master trial point, fixed as data.
    pub trial: &'a TrialPoint,

    /// Core point (auxiliary subproblem only).
    pub core: Option<&'a CorePoint>,

    /// Dual subproblem objective at `trial` (auxiliary subproblem only).
    pub dual_objective: Option<f64>,
}

impl<'a> SubproblemInput<'a> {
    /// Input carrying only a trial point.
    pub fn new(trial: &'a TrialPoint) -> Self {
        Self {
            trial,
            core: None,
            dual_objective: None,
        }
    }

    /// Attach the core point and dual objective.
    pub fn with_stabilization(mut self, core: &'a CorePoint, dual_objective: f64) -> Self {
        self.core = Some(core);
        self.dual_objective = Some(dual_objective);
        self
    }
}

/// A subproblem that is rebuilt from scratch for every trial point.
///
/// Adapters hold no per-iteration state: the trial point is baked into the
/// model's coefficients, so each call to [`build`](Self::build) returns a new
/// model.
pub trait SubproblemAdapter {
    /// Model name.
    fn name(&self) -> &str;

    /// Objective direction.
    fn sense(&self) -> ObjectiveSense;

    /// Solver parameters for the models this adapter builds.
    fn config(&self) -> &SolverConfig;

    /// Declare the variables. Must be deterministic so ids line up across builds.
    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()>;

    /// Declare constraints and the objective for `input`.
    fn declare_constraints(
        &self,
        model: &mut LinearModel,
        input: &SubproblemInput<'_>,
    ) -> LbbdResult<()>;

    /// Build a fresh model for `input`.
    fn build(&self, input: &SubproblemInput<'_>) -> LbbdResult<LinearModel> {
        let mut model = LinearModel::new(self.name(), self.sense(), self.config().clone());
        self.declare_variables(&mut model)?;
        self.declare_constraints(&mut model, input)?;
        Ok(model)
    }
}

/// Turns subproblem multipliers into a master cut.
pub trait CutGenerator {
    /// Build the cut for `iteration` from the solved subproblem `multipliers`.
    ///
    /// `multipliers` is the auxiliary outcome when the family has an auxiliary
    /// subproblem, otherwise the dual outcome.
    fn generate(
        &self,
        multipliers: &SolveOutcome,
        source: CutSource,
        iteration: usize,
    ) -> LbbdResult<BendersCut>;
}

/// Everything a decomposition is built from.
pub struct Components {
    /// Master problem.
    pub master: Box<dyn MasterAdapter>,

    /// Dual subproblem.
    pub dual: Box<dyn SubproblemAdapter>,

    /// Auxiliary (Magnanti-Wong) subproblem; cuts come from the dual without it.
    pub auxiliary: Option<Box<dyn SubproblemAdapter>>,

    /// Primal subproblem, used for solution reporting.
    pub primal: Option<Box<dyn SubproblemAdapter>>,

    /// Cut generator.
    pub cuts: Box<dyn CutGenerator>,
}

impl Components {
    /// Master, dual and cut generator.
    pub fn new(
        master: Box<dyn MasterAdapter>,
        dual: Box<dyn SubproblemAdapter>,
        cuts: Box<dyn CutGenerator>,
    ) -> Self {
        Self {
            master,
            dual,
            auxiliary: None,
            primal: None,
            cuts,
        }
    }

    /// Add an auxiliary subproblem.
    pub fn with_auxiliary(mut self, auxiliary: Box<dyn SubproblemAdapter>) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }

    /// Add a primal subproblem.
    pub fn with_primal(mut self, primal: Box<dyn SubproblemAdapter>) -> Self {
        self.primal = Some(primal);
        self
    }

    /// Source tag for cuts built by this family.
    pub fn cut_source(&self) -> CutSource {
        if self.auxiliary.is_some() {
            CutSource::MagnantiWong
        } else {
            CutSource::Dual
        }
    }
}
