//! A two-row toy family used by the controller tests.
//!
//! Minimize: `min θ` with `θ >= Q(x)`, `Q(x) = max(3 - 2x, 1 + x)`, so
//! `Q(0) = 3`, `Q(1) = 2` and the optimum is 2 at `x = 1`.
//! Maximize: `max θ` with `θ <= R(x)`, `R(x) = min(4 - 2x, 1 + x)`, so
//! `R(0) = 1`, `R(1) = 2` and the optimum is 2 at `x = 1`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use solver_lbbd::adapter::{Components, CutGenerator, MasterAdapter, SubproblemAdapter, SubproblemInput};
use solver_lbbd::decomposition::{DiagnosticReport, DiagnosticSink};
use solver_lbbd::{
    BendersCut, ConstraintSense, CutSource, LbbdError, LbbdResult, LinearExpr, LinearModel,
    MicrolpSolver, ObjectiveSense, SolveOutcome, Solver, SolverConfig, TrialPoint, VarId,
};

/// Optimal value of both toy variants.
pub const OPTIMUM: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct Rows {
    pub sense: ObjectiveSense,
    /// `(constant, slope)` of the two rows.
    pub a: (f64, f64),
    pub b: (f64, f64),
}

impl Rows {
    pub fn minimize() -> Self {
        Rows {
            sense: ObjectiveSense::Minimize,
            a: (3.0, -2.0),
            b: (1.0, 1.0),
        }
    }

    /// `Q(x) = max(3 - x, 1 + x)`: both rows are active at `x = 1`, so the dual
    /// there has two optimal vertices.
    pub fn tied_minimize() -> Self {
        Rows {
            sense: ObjectiveSense::Minimize,
            a: (3.0, -1.0),
            b: (1.0, 1.0),
        }
    }

    pub fn maximize() -> Self {
        Rows {
            sense: ObjectiveSense::Maximize,
            a: (4.0, -2.0),
            b: (1.0, 1.0),
        }
    }

    fn at(&self, x: f64) -> (f64, f64) {
        (self.a.0 + self.a.1 * x, self.b.0 + self.b.1 * x)
    }

    fn dual_sense(&self) -> ObjectiveSense {
        match self.sense {
            ObjectiveSense::Minimize => ObjectiveSense::Maximize,
            ObjectiveSense::Maximize => ObjectiveSense::Minimize,
        }
    }
}

pub struct ToyMaster {
    model: LinearModel,
    x: VarId,
    theta: VarId,
}

impl ToyMaster {
    /// `floor` is a valid bound on θ known up front (minimize only).
    pub fn new(rows: Rows, floor: f64) -> Self {
        let mut model = LinearModel::new("toy_master", rows.sense, SolverConfig::named("toy_master"));
        let x = model.add_binary("x");
        let theta = model.add_continuous("theta", floor, 10.0);
        model
            .set_objective(LinearExpr::from(theta))
            .expect("objective");
        Self { model, x, theta }
    }
}

impl MasterAdapter for ToyMaster {
    fn model(&self) -> &LinearModel {
        &self.model
    }

    fn model_mut(&mut self) -> &mut LinearModel {
        &mut self.model
    }

    fn extract_trial_point(&self, outcome: &SolveOutcome) -> LbbdResult<TrialPoint> {
        TrialPoint::from_outcome(outcome, &[self.x], self.theta)
    }
}

/// Dual (and, with `stabilized`, auxiliary) subproblem over `π1, π2 >= 0`.
pub struct ToyDual {
    rows: Rows,
    stabilized: bool,
    config: SolverConfig,
}

impl ToyDual {
    pub fn dual(rows: Rows) -> Self {
        Self {
            rows,
            stabilized: false,
            config: SolverConfig::named("toy_dual_sub"),
        }
    }

    pub fn auxiliary(rows: Rows) -> Self {
        Self {
            rows,
            stabilized: true,
            config: SolverConfig::named("toy_auxiliary_sub"),
        }
    }
}

impl SubproblemAdapter for ToyDual {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn sense(&self) -> ObjectiveSense {
        self.rows.dual_sense()
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()> {
        model.add_continuous("pi_a", 0.0, f64::INFINITY);
        model.add_continuous("pi_b", 0.0, f64::INFINITY);
        Ok(())
    }

    fn declare_constraints(&self, model: &mut LinearModel, input: &SubproblemInput<'_>) -> LbbdResult<()> {
        let (pa, pb) = (VarId::new(0), VarId::new(1));
        let sum = LinearExpr::from(pa) + LinearExpr::from(pb);
        let dual_row = match self.rows.sense {
            ObjectiveSense::Minimize => ConstraintSense::Le,
            ObjectiveSense::Maximize => ConstraintSense::Ge,
        };
        model.add_constraint("y", sum, dual_row, 1.0)?;

        let (a, b) = self.rows.at(input.trial.get(0));
        let at_trial = LinearExpr::term(pa, a).with_term(pb, b);

        if self.stabilized {
            let (core, ob) = match (input.core, input.dual_objective) {
                (Some(c), Some(ob)) => (c, ob),
                _ => return Err(LbbdError::InvalidPoint("auxiliary needs a core point".into())),
            };
            let tol = 1e-9 * ob.abs().max(1.0);
            match self.rows.sense {
                ObjectiveSense::Minimize => {
                    model.add_constraint("optimality", at_trial, ConstraintSense::Ge, ob - tol)?
                }
                ObjectiveSense::Maximize => {
                    model.add_constraint("optimality", at_trial, ConstraintSense::Le, ob + tol)?
                }
            };
            let (ca, cb) = self.rows.at(core.get(0));
            model.set_objective(LinearExpr::term(pa, ca).with_term(pb, cb))?;
        } else {
            model.set_objective(at_trial)?;
        }
        Ok(())
    }
}

/// Primal subproblem: optimize `y` against both rows at the trial point.
pub struct ToyPrimal {
    rows: Rows,
    config: SolverConfig,
}

impl ToyPrimal {
    pub fn new(rows: Rows) -> Self {
        Self {
            rows,
            config: SolverConfig::named("toy_primal_sub"),
        }
    }
}

impl SubproblemAdapter for ToyPrimal {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn sense(&self) -> ObjectiveSense {
        self.rows.sense
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn declare_variables(&self, model: &mut LinearModel) -> LbbdResult<()> {
        model.add_continuous("y", 0.0, f64::INFINITY);
        Ok(())
    }

    fn declare_constraints(&self, model: &mut LinearModel, input: &SubproblemInput<'_>) -> LbbdResult<()> {
        let y = VarId::new(0);
        let (a, b) = self.rows.at(input.trial.get(0));
        let sense = match self.rows.sense {
            ObjectiveSense::Minimize => ConstraintSense::Ge,
            ObjectiveSense::Maximize => ConstraintSense::Le,
        };
        model.add_constraint("a", y, sense, a)?;
        model.add_constraint("b", y, sense, b)?;
        model.set_objective(LinearExpr::from(y))
    }
}

pub struct ToyCuts {
    rows: Rows,
    x: VarId,
    theta: VarId,
}

impl CutGenerator for ToyCuts {
    fn generate(&self, multipliers: &SolveOutcome, source: CutSource, iteration: usize) -> LbbdResult<BendersCut> {
        let pa = multipliers.value(VarId::new(0)).unwrap_or(0.0);
        let pb = multipliers.value(VarId::new(1)).unwrap_or(0.0);
        let rhs = LinearExpr::constant(pa * self.rows.a.0 + pb * self.rows.b.0)
            + LinearExpr::term(self.x, pa * self.rows.a.1 + pb * self.rows.b.1);
        let sense = match self.rows.sense {
            ObjectiveSense::Minimize => ConstraintSense::Ge,
            ObjectiveSense::Maximize => ConstraintSense::Le,
        };
        Ok(BendersCut::new(LinearExpr::from(self.theta), sense, rhs, source, iteration))
    }
}

/// Full family with auxiliary and primal subproblems.
pub fn components(rows: Rows, floor: f64) -> Components {
    let master = ToyMaster::new(rows, floor);
    let cuts = ToyCuts {
        rows,
        x: master.x,
        theta: master.theta,
    };
    Components::new(Box::new(master), Box::new(ToyDual::dual(rows)), Box::new(cuts))
        .with_auxiliary(Box::new(ToyDual::auxiliary(rows)))
        .with_primal(Box::new(ToyPrimal::new(rows)))
}

/// Toy family whose master forces `x` to 1 and to 0 at once.
///
/// `theta_cap` is satisfiable on its own and must not show up in a conflict.
pub fn infeasible_components(rows: Rows) -> Components {
    let mut master = ToyMaster::new(rows, 0.0);
    let (x, theta) = (master.x, master.theta);
    for (name, lhs, sense, rhs) in [
        ("theta_cap", theta, ConstraintSense::Le, 9.0),
        ("x_high", x, ConstraintSense::Ge, 1.0),
        ("x_low", x, ConstraintSense::Le, 0.0),
    ] {
        master
            .model
            .add_constraint(name, lhs, sense, rhs)
            .expect("master row");
    }
    let cuts = ToyCuts { rows, x, theta };
    Components::new(Box::new(master), Box::new(ToyDual::dual(rows)), Box::new(cuts))
        .with_auxiliary(Box::new(ToyDual::auxiliary(rows)))
        .with_primal(Box::new(ToyPrimal::new(rows)))
}

/// Toy family whose master also carries `Σ 2·z_i = n - 1` over `n` binaries.
///
/// The parity row is infeasible but every LP relaxation on the way down the
/// branch-and-bound tree is feasible, so the master solve runs for a long time.
pub fn stalling_components(rows: Rows, n: usize) -> Components {
    let mut master = ToyMaster::new(rows, 0.0);
    let zs: Vec<VarId> = (0..n).map(|i| master.model.add_binary(format!("z{}", i))).collect();
    let parity: LinearExpr = zs.iter().map(|&z| LinearExpr::term(z, 2.0)).sum();
    master
        .model
        .add_constraint("parity", parity, ConstraintSense::Eq, (n - 1) as f64)
        .expect("parity row");
    let cuts = ToyCuts {
        rows,
        x: master.x,
        theta: master.theta,
    };
    Components::new(Box::new(master), Box::new(ToyDual::dual(rows)), Box::new(cuts))
        .with_auxiliary(Box::new(ToyDual::auxiliary(rows)))
}

/// Backend wrapper that faults, stalls or fakes outcomes for chosen models.
#[derive(Default)]
pub struct ScriptedSolver {
    pub inner: MicrolpSolver,
    /// Fault on every solve of the model with this name.
    pub fault_on: Option<String>,
    /// Report this objective for the model with this name.
    pub constant: Option<(String, f64)>,
    /// Sleep before every solve.
    pub delay: Option<Duration>,
    pub calls: Vec<String>,
}

impl Solver for ScriptedSolver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn solve(&mut self, model: &LinearModel, time_limit: Option<Duration>) -> LbbdResult<SolveOutcome> {
        self.calls.push(model.name().to_string());
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        if self.fault_on.as_deref() == Some(model.name()) {
            return Err(LbbdError::SolverFault("injected fault".into()));
        }
        let mut out = self.inner.solve(model, time_limit)?;
        if let Some((name, value)) = &self.constant {
            if name == model.name() {
                out.objective = Some(*value);
            }
        }
        Ok(out)
    }
}

/// Sink that records the status of every report it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub reports: Rc<RefCell<Vec<String>>>,
}

impl DiagnosticSink for RecordingSink {
    fn export(&mut self, report: &DiagnosticReport) -> LbbdResult<()> {
        self.reports.borrow_mut().push(report.status.to_string());
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
