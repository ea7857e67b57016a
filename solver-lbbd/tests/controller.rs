//! Controller behaviour on the toy family.

mod common;

use std::time::Duration;

use common::{
    components, init_logging, stalling_components, RecordingSink, Rows, ScriptedSolver, OPTIMUM,
};
use solver_lbbd::{
    BendersDecomposition, LbbdSettings, LogVerbosity, MicrolpSolver, SolveOptions, Status,
};

fn settings(max_iterations: usize) -> LbbdSettings {
    LbbdSettings::default()
        .with_max_iterations(max_iterations)
        .with_epsilon(1e-6)
}

#[test]
fn test_minimize_converges() {
    init_logging();
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    let status = lbbd.solve(SolveOptions::default().with_output(LogVerbosity::Steps));

    assert_eq!(status, Status::Optimal);
    assert_eq!(lbbd.status().to_string(), "optimal solution");
    assert!((lbbd.objective() - OPTIMUM).abs() < 1e-6);
    assert_eq!(lbbd.iteration_count(), 2);

    let b = lbbd.bounds();
    assert!((b.upper - b.lower).abs() < 1e-6);

    let incumbent = lbbd.incumbent().expect("incumbent");
    assert_eq!(incumbent.trial.discrete(), &[1.0]);
}

#[test]
fn test_maximize_converges() {
    let mut lbbd = BendersDecomposition::new(
        "toy_max",
        components(Rows::maximize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    let status = lbbd.solve(SolveOptions::default());

    assert_eq!(status, Status::Optimal);
    assert!((lbbd.objective() - OPTIMUM).abs() < 1e-6);
    assert_eq!(lbbd.iteration_count(), 1);
}

#[test]
fn test_upper_bound_non_increasing_when_minimizing() {
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    lbbd.solve(SolveOptions::default());

    let history = lbbd.history();
    assert!(history.len() >= 2);
    for pair in history.windows(2) {
        assert!(pair[1].upper_bound <= pair[0].upper_bound);
    }
}

#[test]
fn test_lower_bound_non_decreasing_when_maximizing() {
    let mut lbbd = BendersDecomposition::new(
        "toy_max",
        components(Rows::maximize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    lbbd.solve(SolveOptions::default());

    for pair in lbbd.history().windows(2) {
        assert!(pair[1].lower_bound >= pair[0].lower_bound);
    }
}

#[test]
fn test_cuts_accumulate() {
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    lbbd.solve(SolveOptions::default());

    let rows: Vec<usize> = lbbd.history().iter().map(|r| r.master_constraints).collect();
    assert_eq!(rows[0], 0);
    for pair in rows.windows(2) {
        assert!(pair[1] > pair[0]);
    }
    assert_eq!(lbbd.cut_log().len(), rows.len() - 1);
    assert_eq!(lbbd.master_model().num_constraints(), lbbd.cut_log().len());
    assert!(lbbd
        .master_model()
        .constraints()
        .iter()
        .all(|c| c.name.starts_with("benders_cut_")));
}

#[test]
fn test_iteration_cap() {
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    lbbd.set_iterations(1);
    let status = lbbd.solve(SolveOptions::default());

    assert_eq!(status, Status::IterationLimit);
    assert_eq!(status.to_string(), "iteration limit exceeded");
    assert_eq!(lbbd.iteration(), Some(0));

    // First update halves the trial point.
    let core = lbbd.core_point().expect("core point");
    let trial = lbbd.history()[0].master_objective;
    assert!((core.proxy() - 0.5 * trial).abs() < 1e-9);
    assert!(core.get(0) == 0.0 || core.get(0) == 0.5);
}

#[test]
fn test_constant_dual_converges_immediately() {
    let solver = ScriptedSolver {
        constant: Some(("toy_dual_sub".to_string(), OPTIMUM)),
        ..ScriptedSolver::default()
    };
    // The master knows the optimum is a valid bound from the start.
    let mut lbbd = BendersDecomposition::new(
        "toy_const",
        components(Rows::minimize(), OPTIMUM),
        solver,
        settings(20),
    );
    let status = lbbd.solve(SolveOptions::default());

    assert_eq!(status, Status::Optimal);
    assert_eq!(lbbd.history().len(), 1);
    assert_eq!(lbbd.iteration_count(), 0);
    assert!(lbbd.cut_log().is_empty());
}

#[test]
fn test_zero_time_budget() {
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    let status = lbbd.solve(SolveOptions::default().with_time_limit(Duration::ZERO));

    assert_eq!(status.to_string(), "time limit exceeded");
    assert_eq!(lbbd.solver().num_solves(), 0);
    assert!(lbbd.history().is_empty());
}

#[test]
fn test_budget_shorter_than_one_solve() {
    let solver = ScriptedSolver {
        delay: Some(Duration::from_millis(30)),
        ..ScriptedSolver::default()
    };
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        solver,
        settings(20),
    );
    let status = lbbd.solve(SolveOptions::default().with_time_limit(Duration::from_millis(5)));

    assert_eq!(status, Status::TimeLimit);
    // Master ran, then the poll before the dual subproblem stopped the loop.
    assert_eq!(lbbd.solver().calls, vec!["toy_master".to_string()]);
}

#[test]
fn test_time_limit_interrupts_long_master_solve() {
    let mut lbbd = BendersDecomposition::new(
        "toy_stall",
        stalling_components(Rows::minimize(), 30),
        MicrolpSolver::new(),
        settings(20).with_min_solve_time(0),
    );
    let status = lbbd.solve(SolveOptions::default().with_time_limit(Duration::from_millis(200)));

    assert_eq!(status, Status::TimeLimit);
    assert_eq!(status.to_string(), "time limit exceeded");
    assert_eq!(lbbd.solver().num_solves(), 1);
    assert!(lbbd.history().is_empty());
    assert!(lbbd.incumbent().is_none());
    assert!(lbbd.solve_time() >= Duration::from_millis(200));
    assert!(lbbd.solve_time() < Duration::from_secs(10));
}

#[test]
fn test_master_fault_reports_solver_error() {
    let solver = ScriptedSolver {
        fault_on: Some("toy_master".to_string()),
        ..ScriptedSolver::default()
    };
    let sink = RecordingSink::default();
    let reports = sink.reports.clone();

    let mut lbbd = BendersDecomposition::new(
        "toy_fault",
        components(Rows::minimize(), 0.0),
        solver,
        settings(20),
    );
    lbbd.set_diagnostics(Box::new(sink));
    let status = lbbd.solve(SolveOptions::default());

    assert_eq!(status.to_string(), "solver error");
    assert_eq!(reports.borrow().as_slice(), &["solver error".to_string()]);
    assert!(lbbd.incumbent().is_none());
    assert_eq!(lbbd.bounds().upper, f64::INFINITY);
}

#[test]
fn test_auxiliary_fault_leaves_bounds_untouched() {
    let solver = ScriptedSolver {
        fault_on: Some("toy_auxiliary_sub".to_string()),
        ..ScriptedSolver::default()
    };
    let mut lbbd = BendersDecomposition::new(
        "toy_fault",
        components(Rows::minimize(), 0.0),
        solver,
        settings(20),
    );
    lbbd.set_diagnostics(Box::new(RecordingSink::default()));
    let status = lbbd.solve(SolveOptions::default());

    assert_eq!(status, Status::SolverError);
    // Bounds advance only after the auxiliary solve.
    assert!(lbbd.incumbent().is_none());
    assert!(lbbd.history().is_empty());
    assert_eq!(lbbd.iteration(), Some(0));
}

#[test]
fn test_resolve_is_repeatable() {
    let mut lbbd = BendersDecomposition::new(
        "toy_min",
        components(Rows::minimize(), 0.0),
        MicrolpSolver::new(),
        settings(20),
    );
    assert_eq!(lbbd.solve(SolveOptions::default()), Status::Optimal);
    let first = lbbd.objective();

    // Cuts from the first run stay in the master.
    assert_eq!(lbbd.solve(SolveOptions::default()), Status::Optimal);
    assert!((lbbd.objective() - first).abs() < 1e-9);
    assert!(lbbd.solve_time() > Duration::ZERO);
}
