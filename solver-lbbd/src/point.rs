//! Trial points and core points.

use serde::Serialize;

use crate::error::{LbbdError, LbbdResult};
use crate::model::{SolveOutcome, VarId};

/// Master decision values extracted after a master solve.
///
/// `discrete` holds the assignment/ordering fields rounded to the nearest
/// integer; `proxy` is the raw value of the master's bound proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialPoint {
    discrete: Vec<f64>,
    proxy: f64,
}

impl TrialPoint {
    /// Build from explicit values. Discrete fields are rounded.
    pub fn new(discrete: Vec<f64>, proxy: f64) -> Self {
        Self {
            discrete: discrete.into_iter().map(f64::round).collect(),
            proxy,
        }
    }

    /// Read the listed master variables from a solve outcome.
    pub fn from_outcome(outcome: &SolveOutcome, discrete: &[VarId], proxy: VarId) -> LbbdResult<Self> {
        let read = |v: VarId| {
            outcome.value(v).ok_or_else(|| {
                LbbdError::InvalidPoint(format!("master solution has no value for var {}", v.index()))
            })
        };
        let values = discrete.iter().map(|&v| read(v)).collect::<LbbdResult<Vec<f64>>>()?;
        Ok(Self::new(values, read(proxy)?))
    }

    /// Discrete fields in layout order.
    pub fn discrete(&self) -> &[f64] {
        &self.discrete
    }

    /// Proxy value.
    pub fn proxy(&self) -> f64 {
        self.proxy
    }

    /// Field `i` of the discrete part.
    pub fn get(&self, i: usize) -> f64 {
        self.discrete[i]
    }

    /// Number of discrete fields.
    pub fn len(&self) -> usize {
        self.discrete.len()
    }

    /// Returns true if there are no discrete fields.
    pub fn is_empty(&self) -> bool {
        self.discrete.is_empty()
    }
}

/// Real-valued point of the same shape as a [`TrialPoint`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorePoint {
    values: Vec<f64>,
    proxy: f64,
}

impl CorePoint {
    /// Build from explicit values.
    pub fn new(values: Vec<f64>, proxy: f64) -> Self {
        Self { values, proxy }
    }

    /// Real-valued copy of a trial point.
    pub fn from_trial(trial: &TrialPoint) -> Self {
        Self {
            values: trial.discrete.clone(),
            proxy: trial.proxy,
        }
    }

    /// `factor * trial`, componentwise including the proxy.
    pub fn scaled(trial: &TrialPoint, factor: f64) -> Self {
        Self {
            values: trial.discrete.iter().map(|v| factor * v).collect(),
            proxy: factor * trial.proxy,
        }
    }

    /// `0.5 * self + 0.5 * trial` on the indexed fields. The proxy is left to the caller.
    pub fn midpoint_values(&self, trial: &TrialPoint) -> LbbdResult<Vec<f64>> {
        if self.values.len() != trial.len() {
            return Err(LbbdError::InvalidPoint(format!(
                "core point has {} fields, trial point has {}",
                self.values.len(),
                trial.len()
            )));
        }
        Ok(self
            .values
            .iter()
            .zip(trial.discrete())
            .map(|(c, t)| 0.5 * c + 0.5 * t)
            .collect())
    }

    /// Indexed fields.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Proxy value.
    pub fn proxy(&self) -> f64 {
        self.proxy
    }

    /// Field `i`.
    pub fn get(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Number of indexed fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no indexed fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
