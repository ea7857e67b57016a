//! Allocation and periodic scheduling on top of `solver-lbbd`.
//!
//! Tasks are assigned to one of their eligible resources and executed
//! cyclically; dependencies carry an iteration distance. The goal is the
//! shortest period. The master decides allocation and relative ordering,
//! the subproblem times a fixed allocation, and stabilized optimality cuts
//! link the two.
//!
//! [`ApspBenders`] wires the adapters into a decomposition;
//! [`MonolithicModel`] solves the same problem as a single MILP.
//! [`ThroughputBenders`] maximizes the throughput `1 / μ` instead, with a
//! maximizing master over integer repetition distances.

#![warn(missing_docs)]

pub mod benders;
pub mod cuts;
pub mod dual;
pub mod error;
pub mod instance;
pub mod layout;
pub mod master;
pub mod monolithic;
pub mod primal;
pub mod rows;
pub mod schedule;
pub mod sdf3;
pub mod settings;
pub mod throughput;

pub use benders::{build_components, ApspBenders};
pub use cuts::ApspCuts;
pub use dual::{ApspAuxiliary, ApspDual};
pub use error::{ApspError, ApspResult};
pub use instance::{ApspInstance, Dependency, DependencySpec, InstanceSpec, Overlap, Task, TaskSpec};
pub use layout::DiscreteLayout;
pub use master::ApspMaster;
pub use monolithic::{MonolithicModel, MonolithicSolution};
pub use primal::ApspPrimal;
pub use rows::{RowKind, ScheduleRow, ScheduleRows};
pub use schedule::{Schedule, ScheduledTask};
pub use sdf3::{from_sdf3_str, Sdf3Naming};
pub use settings::ApspSettings;
pub use throughput::{build_throughput_components, ThroughputBenders};
