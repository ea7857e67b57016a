//! Papadakos core point tracking.
//!
//! Instead of solving an extra LP for a Magnanti-Wong core point, the tracker
//! keeps a running average of trial points. The average is used only by the
//! auxiliary subproblem and never enters the master.

use crate::error::LbbdResult;
use crate::point::{CorePoint, TrialPoint};
use crate::settings::ProxyBlend;

/// Current and previous core point.
#[derive(Debug, Clone, Default)]
pub struct CorePointTracker {
    blend: ProxyBlend,
    current: Option<CorePoint>,
    previous: Option<CorePoint>,
}

impl CorePointTracker {
    /// Create a tracker using `blend` for the proxy field.
    pub fn new(blend: ProxyBlend) -> Self {
        if blend == ProxyBlend::Additive {
            log::warn!("core point uses the additive proxy blend; proxy values will drift");
        }
        Self {
            blend,
            current: None,
            previous: None,
        }
    }

    /// Fold `trial` into the core point for `iteration`.
    ///
    /// At iteration 0 the core point is `0.5 * trial` and the previous point is
    /// the unscaled trial. Afterwards the previous point is the core point of
    /// the prior iteration and every field is averaged with the trial.
    pub fn update(&mut self, trial: &TrialPoint, iteration: usize) -> LbbdResult<&CorePoint> {
        let next = match (&self.current, iteration) {
            (Some(prev), k) if k > 0 => {
                let values = prev.midpoint_values(trial)?;
                let proxy = match self.blend {
                    ProxyBlend::Convex => 0.5 * prev.proxy() + 0.5 * trial.proxy(),
                    ProxyBlend::Additive => 0.5 + prev.proxy() + 0.5 * trial.proxy(),
                };
                self.previous = Some(prev.clone());
                CorePoint::new(values, proxy)
            }
            _ => {
                self.previous = Some(CorePoint::from_trial(trial));
                CorePoint::scaled(trial, 0.5)
            }
        };
        let core: &CorePoint = self.current.insert(next);
        Ok(core)
    }

    /// Core point after the last update.
    pub fn current(&self) -> Option<&CorePoint> {
        self.current.as_ref()
    }

    /// Shadow copy taken before the last update.
    pub fn previous(&self) -> Option<&CorePoint> {
        self.previous.as_ref()
    }

    /// Blend rule in use.
    pub fn blend(&self) -> ProxyBlend {
        self.blend
    }

    /// Forget all state.
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
    }
}
