//! Decomposition controller, time budget and exports.

mod clock;
mod controller;
mod export;

pub use clock::SolveClock;
pub use controller::{BendersDecomposition, IterationRecord};
pub use export::{
    write_model_export, DiagnosticReport, DiagnosticSink, FileDiagnostics, LogDiagnostics,
};
