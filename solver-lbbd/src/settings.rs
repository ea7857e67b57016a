//! Configuration settings for the decomposition.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How much the controller logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    /// Only faults.
    #[default]
    Silent,

    /// One summary line block per iteration.
    Iterations,

    /// Per-iteration summary plus a banner for every step.
    Steps,
}

impl LogVerbosity {
    /// Map the numeric levels 0/1/2 used on the command line.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => LogVerbosity::Silent,
            1 => LogVerbosity::Iterations,
            _ => LogVerbosity::Steps,
        }
    }
}

/// Blend rule for the scalar proxy field of the core point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyBlend {
    /// `0.5 * previous + 0.5 * trial`, like every other field.
    #[default]
    Convex,

    /// `0.5 + previous + 0.5 * trial`.
    ///
    /// Not a convex combination and grows without bound; only kept to reproduce
    /// runs made with that rule.
    Additive,
}

/// Solver parameters stamped on every model an adapter builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Model label used in logs and exports.
    pub name: String,

    /// Values within this distance of an integer are snapped for discrete variables.
    pub integrality_tol: f64,

    /// Budget for infeasibility diagnosis in milliseconds.
    pub conflict_time_limit_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            name: String::from("model"),
            integrality_tol: 1e-6,
            conflict_time_limit_ms: 180_000,
        }
    }
}

impl SolverConfig {
    /// Config with a model label.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the integrality tolerance.
    pub fn with_integrality_tol(mut self, tol: f64) -> Self {
        self.integrality_tol = tol;
        self
    }

    /// Set the conflict diagnosis budget.
    pub fn with_conflict_time_limit(mut self, ms: u64) -> Self {
        self.conflict_time_limit_ms = ms;
        self
    }

    /// Conflict diagnosis budget as a duration.
    pub fn conflict_time_limit(&self) -> Duration {
        Duration::from_millis(self.conflict_time_limit_ms)
    }
}

/// Decomposition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbbdSettings {
    // === Termination criteria ===
    /// Maximum number of iterations.
    pub max_iterations: usize,

    /// Stop when `|upper - lower| < epsilon`.
    pub epsilon: f64,

    /// Time limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    // === Core point ===
    /// Blend rule for the proxy field.
    pub proxy_blend: ProxyBlend,

    // === Backend ===
    /// Floor applied to every per-solve time limit, in milliseconds.
    pub min_solve_time_ms: u64,

    // === Output ===
    /// Default logging verbosity.
    pub verbosity: LogVerbosity,
}

impl Default for LbbdSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            epsilon: 1e-6,
            time_limit_ms: None,
            proxy_blend: ProxyBlend::Convex,
            min_solve_time_ms: 1000,
            verbosity: LogVerbosity::Silent,
        }
    }
}

impl LbbdSettings {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.epsilon = eps;
        self
    }

    /// Set the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Set the proxy blend rule.
    pub fn with_proxy_blend(mut self, blend: ProxyBlend) -> Self {
        self.proxy_blend = blend;
        self
    }

    /// Set the default verbosity.
    pub fn with_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the per-solve time floor in milliseconds.
    pub fn with_min_solve_time(mut self, ms: u64) -> Self {
        self.min_solve_time_ms = ms;
        self
    }

    /// Per-solve time floor.
    pub fn min_solve_time(&self) -> Duration {
        Duration::from_millis(self.min_solve_time_ms)
    }
}

/// Runtime arguments of a single `solve` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Emit progress output at all.
    pub print_output: bool,

    /// Progress detail when `print_output` is set.
    pub verbosity: LogVerbosity,

    /// Overall time budget (None = unlimited).
    pub time_limit: Option<Duration>,

    /// Directory for error logs written on the failure path.
    pub log_destination: Option<PathBuf>,

    /// Base file name for error logs.
    pub log_file_name: String,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            print_output: false,
            verbosity: LogVerbosity::Silent,
            time_limit: None,
            log_destination: None,
            log_file_name: String::from("log"),
        }
    }
}

impl SolveOptions {
    /// Options seeded from the decomposition settings.
    pub fn from_settings(settings: &LbbdSettings) -> Self {
        Self {
            print_output: settings.verbosity != LogVerbosity::Silent,
            verbosity: settings.verbosity,
            time_limit: settings.time_limit_ms.map(Duration::from_millis),
            ..Self::default()
        }
    }

    /// Set the time budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Enable output at the given verbosity.
    pub fn with_output(mut self, verbosity: LogVerbosity) -> Self {
        self.print_output = true;
        self.verbosity = verbosity;
        self
    }

    /// Write error logs under `dir` using `file_name`.
    pub fn with_log_destination(mut self, dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        self.log_destination = Some(dir.into());
        self.log_file_name = file_name.into();
        self
    }

    /// Verbosity after applying `print_output`.
    pub fn effective_verbosity(&self) -> LogVerbosity {
        if self.print_output {
            self.verbosity
        } else {
            LogVerbosity::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = LbbdSettings::default();
        assert_eq!(s.max_iterations, 1000);
        assert_eq!(s.epsilon, 1e-6);
        assert_eq!(s.proxy_blend, ProxyBlend::Convex);
        assert_eq!(s.min_solve_time(), Duration::from_secs(1));
        assert_eq!(SolverConfig::default().conflict_time_limit(), Duration::from_secs(180));
    }

    #[test]
    fn test_print_output_forces_silent() {
        let mut opts = SolveOptions::default().with_output(LogVerbosity::Steps);
        assert_eq!(opts.effective_verbosity(), LogVerbosity::Steps);
        opts.print_output = false;
        assert_eq!(opts.effective_verbosity(), LogVerbosity::Silent);
        assert_eq!(LogVerbosity::from_level(1), LogVerbosity::Iterations);
        assert_eq!(LogVerbosity::from_level(9), LogVerbosity::Steps);
    }

    #[test]
    fn test_options_from_settings() {
        let s = LbbdSettings::default()
            .with_time_limit(2500)
            .with_verbosity(LogVerbosity::Iterations);
        let o = SolveOptions::from_settings(&s);
        assert!(o.print_output);
        assert_eq!(o.time_limit, Some(Duration::from_millis(2500)));
        assert_eq!(o.log_file_name, "log");
    }
}
