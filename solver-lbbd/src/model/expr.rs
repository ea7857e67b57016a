//! Affine expressions over model variables.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::linear::VarId;

/// Affine expression `Σ c_j x_j + constant`.
///
/// Terms are kept in a sorted map so a variable never appears twice, which the
/// backends require for constraint rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    /// Empty expression (zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// Single term `coef * var`.
    pub fn term(var: VarId, coef: f64) -> Self {
        let mut expr = Self::new();
        expr.add_term(var, coef);
        expr
    }

    /// Add `coef * var`, merging with an existing term.
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        *self.terms.entry(var).or_insert(0.0) += coef;
    }

    /// Add a constant offset.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Builder form of [`add_term`](Self::add_term).
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Iterate over `(variable, coefficient)` pairs in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    /// Constant part.
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// Coefficient of `var` (zero if absent).
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    /// Number of stored terms.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// True if there are no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.values().all(|c| *c == 0.0)
    }

    /// Evaluate at a dense value vector indexed by variable id.
    ///
    /// Variables beyond the end of `values` evaluate as zero.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    /// Drop terms whose magnitude is at most `tol`.
    pub fn prune(&mut self, tol: f64) {
        self.terms.retain(|_, c| c.abs() > tol);
    }

    /// Largest variable index referenced, if any.
    pub fn max_var(&self) -> Option<VarId> {
        self.terms.keys().next_back().copied()
    }

    /// Returns true if every coefficient and the constant are finite.
    pub fn is_finite(&self) -> bool {
        self.constant.is_finite() && self.terms.values().all(|c| c.is_finite())
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.constant += rhs.constant;
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        for (v, c) in rhs.terms {
            self.add_term(v, -c);
        }
        self.constant -= rhs.constant;
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> LinearExpr {
        self.constant += rhs;
        self
    }
}

impl Sub<f64> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: f64) -> LinearExpr {
        self.constant -= rhs;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for c in self.terms.values_mut() {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> LinearExpr {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_arithmetic() {
        let x = VarId::new(0);
        let y = VarId::new(1);

        // (2x + 1) - (x - 3y + 4) = x + 3y - 3
        let a = LinearExpr::term(x, 2.0) + 1.0;
        let b = LinearExpr::term(x, 1.0).with_term(y, -3.0) + 4.0;
        let e = a - b;

        assert_eq!(e.coefficient(x), 1.0);
        assert_eq!(e.coefficient(y), 3.0);
        assert_eq!(e.constant_value(), -3.0);
        assert!((e.evaluate(&[2.0, 1.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_expr_merges_terms() {
        let x = VarId::new(3);
        let e: LinearExpr = (0..4).map(|_| LinearExpr::from(x)).sum();
        assert_eq!(e.num_terms(), 1);
        assert_eq!(e.coefficient(x), 4.0);

        let mut z = e.clone() - LinearExpr::term(x, 4.0);
        assert!(z.is_constant());
        z.prune(1e-12);
        assert_eq!(z.num_terms(), 0);
    }

    #[test]
    fn test_expr_scaling() {
        let x = VarId::new(0);
        let e = -(LinearExpr::term(x, 2.0) + 1.0) * 3.0;
        assert_eq!(e.coefficient(x), -6.0);
        assert_eq!(e.constant_value(), -3.0);
        assert_eq!(e.max_var(), Some(x));
    }
}
