//! Backend built on the pure-Rust `microlp` simplex / branch-and-bound solver.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use microlp::{ComparisonOp, OptimizationDirection, Problem};

use super::Solver;
use crate::error::{LbbdError, LbbdResult};
use crate::model::{
    BackendStatus, ConstraintSense, LinearModel, ObjectiveSense, SolveOutcome, VarId, VarKind,
};

/// `microlp` backend.
///
/// `microlp` has no time limit of its own. With a limit, the model is solved
/// on a worker thread and the caller waits at most that long; on expiry the
/// solve reports [`BackendStatus::TimeLimit`] and the worker's result is
/// discarded when it eventually arrives. A zero limit returns at once without
/// touching the model.
#[derive(Debug, Default)]
pub struct MicrolpSolver {
    solves: usize,
}

impl MicrolpSolver {
    /// Create a new backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of models solved so far.
    pub fn num_solves(&self) -> usize {
        self.solves
    }
}

/// What one `microlp` run produced.
enum RawOutcome {
    Solved(Vec<f64>),
    Failed(microlp::Error),
    /// A row without variables is violated, so the model is infeasible as stated.
    EmptyRowViolated,
}

/// Result of translating a model; `None` means an empty row is violated.
fn build_problem(model: &LinearModel) -> Option<(Problem, Vec<microlp::Variable>)> {
    let direction = match model.sense() {
        ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        ObjectiveSense::Maximize => OptimizationDirection::Maximize,
    };
    let mut problem = Problem::new(direction);
    let objective = model.objective();

    let vars: Vec<microlp::Variable> = model
        .variables()
        .iter()
        .enumerate()
        .map(|(j, v)| {
            let c = objective.coefficient(VarId::new(j));
            match v.kind {
                VarKind::Continuous => problem.add_var(c, (v.lower, v.upper)),
                VarKind::Binary => problem.add_binary_var(c),
                VarKind::Integer => {
                    problem.add_integer_var(c, (clamp_i32(v.lower), clamp_i32(v.upper)))
                }
            }
        })
        .collect();

    for c in model.constraints() {
        if c.row.nnz() == 0 {
            if !c.sense.holds(0.0, c.rhs, model.config().integrality_tol) {
                return None;
            }
            continue;
        }
        let op = match c.sense {
            ConstraintSense::Le => ComparisonOp::Le,
            ConstraintSense::Ge => ComparisonOp::Ge,
            ConstraintSense::Eq => ComparisonOp::Eq,
        };
        problem.add_constraint(c.row.iter().map(|(j, a)| (vars[j], *a)), op, c.rhs);
    }

    Some((problem, vars))
}

/// Translate and solve, turning a backend panic into its message.
fn run(model: &LinearModel) -> Result<RawOutcome, String> {
    catch_unwind(AssertUnwindSafe(|| {
        let Some((problem, vars)) = build_problem(model) else {
            return RawOutcome::EmptyRowViolated;
        };
        match problem.solve() {
            Ok(solution) => RawOutcome::Solved(vars.iter().map(|v| *solution.var_value(*v)).collect()),
            Err(e) => RawOutcome::Failed(e),
        }
    }))
    .map_err(panic_message)
}

/// [`run`] on a worker thread, waiting at most `limit`. `None` when the limit expires.
fn run_with_limit(model: LinearModel, limit: Duration) -> LbbdResult<Option<Result<RawOutcome, String>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("microlp-worker".into())
        .spawn(move || {
            // The receiver is gone once the caller stopped waiting.
            let _ = tx.send(run(&model));
        })
        .map_err(|e| LbbdError::SolverFault(format!("cannot start solver thread: {}", e)))?;

    match rx.recv_timeout(limit) {
        Ok(result) => Ok(Some(result)),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(LbbdError::SolverFault(
            "solver thread exited without a result".into(),
        )),
    }
}

fn clamp_i32(v: f64) -> i32 {
    v.clamp(i32::MIN as f64, i32::MAX as f64).round() as i32
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "backend panicked".to_string()
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(
        &mut self,
        model: &LinearModel,
        time_limit: Option<Duration>,
    ) -> LbbdResult<SolveOutcome> {
        if time_limit.is_some_and(|l| l.is_zero()) {
            return Ok(SolveOutcome::without_solution(BackendStatus::TimeLimit));
        }

        let start = Instant::now();
        self.solves += 1;

        let finished = match time_limit {
            Some(limit) => run_with_limit(model.clone(), limit)?,
            None => Some(run(model)),
        };

        let outcome = match finished {
            None => {
                log::debug!("{}: stopped waiting after {:?}", model.name(), time_limit);
                SolveOutcome::without_solution(BackendStatus::TimeLimit)
            }
            Some(Err(panic)) => return Err(LbbdError::SolverFault(panic)),
            Some(Ok(RawOutcome::Solved(raw))) => {
                let tol = model.config().integrality_tol;
                let values: Vec<f64> = raw
                    .into_iter()
                    .zip(model.variables())
                    .map(|(v, decl)| {
                        if decl.kind.is_discrete() && (v - v.round()).abs() <= tol {
                            v.round()
                        } else {
                            v
                        }
                    })
                    .collect();
                let objective = model.objective_value(&values);
                SolveOutcome::solved(BackendStatus::Optimal, objective, values)
            }
            Some(Ok(RawOutcome::EmptyRowViolated | RawOutcome::Failed(microlp::Error::Infeasible))) => {
                SolveOutcome::without_solution(BackendStatus::Infeasible)
            }
            Some(Ok(RawOutcome::Failed(microlp::Error::Unbounded))) => {
                SolveOutcome::without_solution(BackendStatus::Unbounded)
            }
            Some(Ok(RawOutcome::Failed(e))) => return Err(LbbdError::SolverFault(e.to_string())),
        };

        let elapsed = start.elapsed();
        log::trace!(
            "{}: {} in {:.3}s",
            model.name(),
            outcome.status,
            elapsed.as_secs_f64()
        );
        Ok(outcome.with_solve_time(elapsed))
    }
}
