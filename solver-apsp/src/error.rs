//! Error types for the scheduling family.

use thiserror::Error;

use solver_lbbd::LbbdError;

/// Errors raised while loading instances or building scheduling models.
#[derive(Error, Debug)]
pub enum ApspError {
    /// Instance validation failed.
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    /// A dependency or duration names a task that does not exist.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// A duration names a resource that does not exist.
    #[error("Unknown resource {resource} for task {task}")]
    UnknownResource {
        /// Task carrying the duration.
        task: String,
        /// Resource name that was not declared.
        resource: String,
    },

    /// A solution does not assign a task to exactly one resource.
    #[error("Task {0} has no assigned resource")]
    Unassigned(String),

    /// A model was solved but produced no solution.
    #[error("No solution available: {0}")]
    NoSolution(String),

    /// Error from the decomposition layer.
    #[error(transparent)]
    Lbbd(#[from] LbbdError),

    /// Reading an instance failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Instance JSON could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// SDF3 XML could not be parsed.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Result type for scheduling operations.
pub type ApspResult<T> = Result<T, ApspError>;
