//! Logic-based Benders decomposition with Magnanti-Wong-Papadakos cut stabilization.
//!
//! A problem family plugs in a master problem, a dual subproblem and
//! (optionally) an auxiliary and a primal subproblem through the traits in
//! [`adapter`]. [`BendersDecomposition`] then alternates between the master
//! and the subproblems, averaging trial points into a core point and adding
//! one stabilized optimality cut per iteration until the bounds meet, the
//! iteration cap is hit, or the time budget runs out.
//!
//! Models are solved through the [`Solver`] trait; [`MicrolpSolver`] is the
//! bundled pure-Rust backend.

#![warn(missing_docs)]

pub mod adapter;
pub mod backend;
pub mod bounds;
pub mod core_point;
pub mod cuts;
pub mod decomposition;
pub mod error;
pub mod model;
pub mod point;
pub mod settings;
pub mod status;

pub use adapter::{Components, CutGenerator, MasterAdapter, SubproblemAdapter, SubproblemInput};
pub use backend::{Conflict, MicrolpSolver, Solver};
pub use bounds::{BoundTracker, Bounds, Incumbent, ModelSnapshot};
pub use core_point::CorePointTracker;
pub use cuts::{BendersCut, CutLog, CutSource};
pub use decomposition::{
    BendersDecomposition, DiagnosticReport, DiagnosticSink, FileDiagnostics, IterationRecord,
    LogDiagnostics,
};
pub use error::{FailureReason, LbbdError, LbbdResult};
pub use model::{
    BackendStatus, ConstraintSense, LinearExpr, LinearModel, ObjectiveSense, SolveOutcome, VarId,
    VarKind,
};
pub use point::{CorePoint, TrialPoint};
pub use settings::{LbbdSettings, LogVerbosity, ProxyBlend, SolveOptions, SolverConfig};
pub use status::{Stage, Status};
