//! Optimality cuts and their bookkeeping.

mod cut;
mod cut_log;

pub use cut::{BendersCut, CutSource};
pub use cut_log::{CutLog, CutLogStats, LoggedCut};
