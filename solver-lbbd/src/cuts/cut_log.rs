//! Append-only record of the cuts added to the master.

use super::cut::{BendersCut, CutSource};

/// Statistics for the cut log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CutLogStats {
    /// Total cuts added.
    pub total_added: usize,

    /// Cuts parallel to an earlier cut with the same right-hand side.
    pub repeated: usize,

    /// Cuts built from auxiliary multipliers.
    pub magnanti_wong: usize,

    /// Cuts built from dual multipliers.
    pub dual: usize,
}

/// A logged cut with the master row it became.
#[derive(Debug, Clone)]
pub struct LoggedCut {
    /// The cut.
    pub cut: BendersCut,

    /// Constraint index in the master.
    pub row: usize,

    /// True if an earlier cut was parallel to this one.
    pub repeated: bool,
}

/// Every cut ever appended to the master, in order.
///
/// Cuts are never removed. A repeated cut means the master proposed a trial
/// point it had already seen, which usually signals a stall.
#[derive(Debug, Default, Clone)]
pub struct CutLog {
    cuts: Vec<LoggedCut>,
    stats: CutLogStats,
}

impl CutLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `cut` as master row `row`. Returns true if it repeats an earlier cut.
    pub fn record(&mut self, cut: BendersCut, row: usize) -> bool {
        let repeated = self.cuts.iter().any(|c| is_duplicate(&c.cut, &cut));
        if repeated {
            self.stats.repeated += 1;
        }
        match cut.source {
            CutSource::MagnantiWong => self.stats.magnanti_wong += 1,
            CutSource::Dual => self.stats.dual += 1,
        }
        self.stats.total_added += 1;
        self.cuts.push(LoggedCut { cut, row, repeated });
        repeated
    }

    /// All logged cuts.
    pub fn cuts(&self) -> &[LoggedCut] {
        &self.cuts
    }

    /// Number of logged cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Returns true if no cut was logged.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Statistics.
    pub fn stats(&self) -> &CutLogStats {
        &self.stats
    }

    /// Forget all cuts.
    pub fn clear(&mut self) {
        self.cuts.clear();
        self.stats = CutLogStats::default();
    }
}

/// Check if two cuts are parallel with matching scaled right-hand sides.
fn is_duplicate(a: &BendersCut, b: &BendersCut) -> bool {
    if a.sense != b.sense {
        return false;
    }

    let a_norm: f64 = a.expr.terms().map(|(_, c)| c * c).sum::<f64>().sqrt();
    let b_norm: f64 = b.expr.terms().map(|(_, c)| c * c).sum::<f64>().sqrt();

    if a_norm < 1e-10 || b_norm < 1e-10 {
        return a_norm < 1e-10 && b_norm < 1e-10;
    }

    let dot: f64 = a
        .expr
        .terms()
        .map(|(v, c)| c * b.expr.coefficient(v))
        .sum();
    let cos_angle = dot / (a_norm * b_norm);

    if cos_angle > 0.9999 {
        let rhs_diff = (a.rhs / a_norm - b.rhs / b_norm).abs();
        return rhs_diff < 1e-8;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintSense, LinearExpr, VarId};

    fn cut(coef: f64, rhs: f64, iteration: usize) -> BendersCut {
        BendersCut::new(
            LinearExpr::term(VarId::new(0), 1.0).with_term(VarId::new(1), coef),
            ConstraintSense::Ge,
            LinearExpr::constant(rhs),
            CutSource::MagnantiWong,
            iteration,
        )
    }

    #[test]
    fn test_repeated_cut_detection() {
        let mut log = CutLog::new();
        assert!(!log.record(cut(2.0, 3.0, 1), 5));
        assert!(!log.record(cut(1.0, 3.0, 2), 6));
        // Same direction, same scaled rhs
        let scaled = BendersCut::new(
            LinearExpr::term(VarId::new(0), 2.0).with_term(VarId::new(1), 4.0),
            ConstraintSense::Ge,
            LinearExpr::constant(6.0),
            CutSource::Dual,
            3,
        );
        assert!(log.record(scaled, 7));

        let stats = log.stats();
        assert_eq!(stats.total_added, 3);
        assert_eq!(stats.repeated, 1);
        assert_eq!(stats.magnanti_wong, 2);
        assert_eq!(stats.dual, 1);
        assert_eq!(log.cuts()[2].row, 7);
    }
}
