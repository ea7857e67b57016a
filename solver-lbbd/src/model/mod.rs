//! Linear model layer shared by the master and subproblem adapters.

mod expr;
mod linear;
mod lp_format;
mod outcome;

pub use expr::LinearExpr;
pub use linear::{
    Constraint, ConstraintSense, LinearModel, ObjectiveSense, VarId, VarKind, Variable,
};
pub use lp_format::to_lp_string;
pub use outcome::{BackendStatus, SolveOutcome};
