//! Linear and mixed-integer model representation.

use std::fmt;

use serde::Serialize;
use sprs::CsVec;

use super::expr::LinearExpr;
use crate::error::{LbbdError, LbbdResult};
use crate::settings::SolverConfig;

/// Index of a variable within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VarId(usize);

impl VarId {
    /// Wrap a raw index.
    pub const fn new(index: usize) -> Self {
        VarId(index)
    }

    /// Raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    /// Real-valued.
    Continuous,

    /// Integer-valued.
    Integer,

    /// 0/1.
    Binary,
}

impl VarKind {
    /// Returns true for integer and binary variables.
    pub fn is_discrete(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name (unique within the model).
    pub name: String,

    /// Domain.
    pub kind: VarKind,

    /// Lower bound.
    pub lower: f64,

    /// Upper bound (`f64::INFINITY` if unbounded).
    pub upper: f64,
}

/// Row sense of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintSense {
    /// `row <= rhs`
    Le,

    /// `row >= rhs`
    Ge,

    /// `row = rhs`
    Eq,
}

impl ConstraintSense {
    /// Check `lhs (sense) rhs` within `tol`.
    pub fn holds(self, lhs: f64, rhs: f64, tol: f64) -> bool {
        match self {
            ConstraintSense::Le => lhs <= rhs + tol,
            ConstraintSense::Ge => lhs >= rhs - tol,
            ConstraintSense::Eq => (lhs - rhs).abs() <= tol,
        }
    }
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::Le => write!(f, "<="),
            ConstraintSense::Ge => write!(f, ">="),
            ConstraintSense::Eq => write!(f, "="),
        }
    }
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveSense {
    /// Minimize the objective.
    Minimize,

    /// Maximize the objective.
    Maximize,
}

/// A linear constraint `row (sense) rhs` stored as a sparse row.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Constraint name.
    pub name: String,

    /// Sparse coefficient row over the model's variables.
    pub row: CsVec<f64>,

    /// Row sense.
    pub sense: ConstraintSense,

    /// Right-hand side.
    pub rhs: f64,
}

impl Constraint {
    /// Row activity at `values`.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.row
            .iter()
            .map(|(j, a)| a * values.get(j).copied().unwrap_or(0.0))
            .sum()
    }

    /// Returns true if `values` satisfy the constraint within `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        self.sense.holds(self.activity(values), self.rhs, tol)
    }
}

/// A linear/mixed-integer optimization model.
///
/// Adapters build a fresh model whenever their data changes; the master model
/// is the only one that grows in place (by appending cuts).
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    sense: ObjectiveSense,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
    config: SolverConfig,
}

impl LinearModel {
    /// Create an empty model.
    pub fn new(name: impl Into<String>, sense: ObjectiveSense, config: SolverConfig) -> Self {
        Self {
            name: name.into(),
            sense,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            config,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Objective direction.
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Solver parameters stamped on this model.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Add a variable and return its id.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        id
    }

    /// Add a continuous variable.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, VarKind::Continuous, lower, upper)
    }

    /// Add an integer variable.
    pub fn add_integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, VarKind::Integer, lower, upper)
    }

    /// Add a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, VarKind::Binary, 0.0, 1.0)
    }

    /// Set the objective expression. A constant part is kept as an offset.
    pub fn set_objective(&mut self, objective: LinearExpr) -> LbbdResult<()> {
        self.check_expr(&objective)?;
        self.objective = objective;
        Ok(())
    }

    /// Objective expression.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Add `lhs (sense) rhs`, normalized to `row (sense) constant`.
    ///
    /// Returns the constraint index.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        sense: ConstraintSense,
        rhs: impl Into<LinearExpr>,
    ) -> LbbdResult<usize> {
        let name = name.into();
        let mut expr = lhs.into() - rhs.into();
        if !expr.is_finite() {
            return Err(LbbdError::InvalidModel(format!(
                "constraint {} has non-finite coefficients",
                name
            )));
        }
        self.check_expr(&expr)?;
        expr.prune(0.0);

        let (indices, data): (Vec<usize>, Vec<f64>) =
            expr.terms().map(|(v, c)| (v.index(), c)).unzip();
        let row = CsVec::new(self.variables.len(), indices, data);

        self.constraints.push(Constraint {
            name,
            row,
            sense,
            rhs: -expr.constant_value(),
        });
        Ok(self.constraints.len() - 1)
    }

    fn check_expr(&self, expr: &LinearExpr) -> LbbdResult<()> {
        match expr.max_var() {
            Some(v) if v.index() >= self.variables.len() => Err(LbbdError::InvalidModel(format!(
                "model {} has no variable with index {}",
                self.name,
                v.index()
            ))),
            _ => Ok(()),
        }
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variable by id.
    pub fn var(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    /// Look up a variable by name.
    pub fn find_var(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    /// All constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns true if any variable is integer or binary.
    pub fn is_mip(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_discrete())
    }

    /// Objective value at `values`.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Copy of this model restricted to the constraints at `keep`.
    pub fn with_constraint_subset(&self, keep: &[usize]) -> LinearModel {
        LinearModel {
            constraints: keep
                .iter()
                .filter_map(|&i| self.constraints.get(i).cloned())
                .collect(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_normalization() {
        let mut m = LinearModel::new("m", ObjectiveSense::Minimize, SolverConfig::default());
        let x = m.add_continuous("x", 0.0, 10.0);
        let y = m.add_integer("y", 0.0, 5.0);

        // x + 2 >= 3y - 1  =>  x - 3y >= -3
        let lhs = LinearExpr::from(x) + 2.0;
        let rhs = LinearExpr::term(y, 3.0) - 1.0;
        let idx = m.add_constraint("c0", lhs, ConstraintSense::Ge, rhs).unwrap();

        let c = &m.constraints()[idx];
        assert_eq!(c.rhs, -3.0);
        assert_eq!(c.row.get(x.index()), Some(&1.0));
        assert_eq!(c.row.get(y.index()), Some(&-3.0));
        assert!(c.is_satisfied(&[0.0, 1.0], 1e-9));
        assert!(!c.is_satisfied(&[0.0, 2.0], 1e-9));
        assert!(m.is_mip());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut m = LinearModel::new("m", ObjectiveSense::Maximize, SolverConfig::default());
        m.add_binary("b");
        let res = m.add_constraint(
            "bad",
            LinearExpr::term(VarId::new(7), 1.0),
            ConstraintSense::Le,
            1.0,
        );
        assert!(matches!(res, Err(LbbdError::InvalidModel(_))));
        assert_eq!(m.num_constraints(), 0);
    }

    #[test]
    fn test_constraint_subset() {
        let mut m = LinearModel::new("m", ObjectiveSense::Minimize, SolverConfig::default());
        let x = m.add_continuous("x", 0.0, f64::INFINITY);
        for k in 0..3 {
            m.add_constraint(format!("c{}", k), x, ConstraintSense::Ge, k as f64)
                .unwrap();
        }
        let sub = m.with_constraint_subset(&[0, 2]);
        assert_eq!(sub.num_constraints(), 2);
        assert_eq!(sub.constraints()[1].name, "c2");
        assert_eq!(m.find_var("x"), Some(x));
    }
}
