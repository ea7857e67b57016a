//! Wall-clock budget for a decomposition run.

use std::time::{Duration, Instant};

use crate::error::{LbbdError, LbbdResult};

/// Polled time budget.
#[derive(Debug, Clone, Copy)]
pub struct SolveClock {
    start: Instant,
    budget: Option<Duration>,
}

impl SolveClock {
    /// Start the clock with an optional budget.
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Remaining budget (None = unlimited).
    pub fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.elapsed()))
    }

    /// Fail with [`LbbdError::TimeLimit`] once the budget is used up.
    pub fn check(&self) -> LbbdResult<()> {
        match self.remaining() {
            Some(r) if r.is_zero() => Err(LbbdError::TimeLimit),
            _ => Ok(()),
        }
    }

    /// Time limit for the next backend solve: the remaining budget, never below `floor`.
    pub fn solve_limit(&self, floor: Duration) -> Option<Duration> {
        self.remaining().map(|r| r.max(floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_clock() {
        let clock = SolveClock::start(None);
        assert!(clock.check().is_ok());
        assert_eq!(clock.remaining(), None);
        assert_eq!(clock.solve_limit(Duration::from_secs(1)), None);
    }

    #[test]
    fn test_exhausted_clock() {
        let clock = SolveClock::start(Some(Duration::ZERO));
        assert!(matches!(clock.check(), Err(LbbdError::TimeLimit)));
        assert_eq!(
            clock.solve_limit(Duration::from_millis(1000)),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_generous_clock() {
        let clock = SolveClock::start(Some(Duration::from_secs(3600)));
        assert!(clock.check().is_ok());
        assert!(clock.solve_limit(Duration::from_secs(1)).unwrap() > Duration::from_secs(1));
    }
}
