//! Boolean constraint model.
//!
//! A `CpModel` holds boolean decision variables, linear constraints over
//! them (`lo <= Σ coef·x <= hi`) and an optional linear objective. Every
//! constraint carries a *family* label so that a solver can report which
//! kind of rule it found in conflict.

/// Handle to a boolean variable of a [`CpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(pub(crate) usize);

impl BoolVar {
    /// Position of the variable in the model.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A linear constraint `lo <= Σ coef·var <= hi` over boolean variables.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    /// Constraint family label (e.g. `"bench-size"`).
    pub family: String,
    /// `(variable, coefficient)` terms.
    pub terms: Vec<(BoolVar, i64)>,
    /// Inclusive lower bound.
    pub lo: i64,
    /// Inclusive upper bound.
    pub hi: i64,
}

impl LinearConstraint {
    /// Whether the constraint holds under a full assignment.
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        let activity: i64 = self
            .terms
            .iter()
            .filter(|(v, _)| values[v.0])
            .map(|(_, c)| *c)
            .sum();
        self.lo <= activity && activity <= self.hi
    }

    /// Smallest and largest activity any assignment can reach.
    pub fn activity_range(&self) -> (i64, i64) {
        self.terms.iter().fold((0, 0), |(lo, hi), &(_, c)| {
            if c < 0 {
                (lo + c, hi)
            } else {
                (lo, hi + c)
            }
        })
    }
}

/// Optimization objective.
#[derive(Debug, Clone, Default)]
pub enum Objective {
    /// Any assignment satisfying the constraints is acceptable.
    #[default]
    Satisfy,
    /// Minimize `Σ weight·var`.
    Minimize(Vec<(BoolVar, i64)>),
}

impl Objective {
    /// Objective value of a full assignment (`0` for `Satisfy`).
    pub fn evaluate(&self, values: &[bool]) -> i64 {
        match self {
            Objective::Satisfy => 0,
            Objective::Minimize(terms) => terms
                .iter()
                .filter(|(v, _)| values[v.0])
                .map(|(_, w)| *w)
                .sum(),
        }
    }
}

/// A boolean constraint model.
///
/// # Example
/// ```
/// use u_rotation::cp::{CpModel, CpSolver, MilpSolver, SolverConfig, SolveStatus};
///
/// let mut model = CpModel::new("pick-two");
/// let xs: Vec<_> = (0..4).map(|i| model.new_bool(format!("x{i}"))).collect();
/// model.add_sum_eq("pick", &xs, 2);
///
/// let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.status, SolveStatus::Optimal);
/// assert_eq!(xs.iter().filter(|&&x| solution.value(x)).count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    var_names: Vec<String>,
    constraints: Vec<LinearConstraint>,
    objective: Objective,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_names: Vec::new(),
            constraints: Vec::new(),
            objective: Objective::Satisfy,
        }
    }

    /// Model name (used in log output).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a boolean variable.
    pub fn new_bool(&mut self, name: impl Into<String>) -> BoolVar {
        self.var_names.push(name.into());
        BoolVar(self.var_names.len() - 1)
    }

    /// Name of a variable.
    pub fn var_name(&self, var: BoolVar) -> &str {
        &self.var_names[var.0]
    }

    /// Adds `lo <= Σ coef·var <= hi`.
    pub fn add_linear(
        &mut self,
        family: impl Into<String>,
        terms: Vec<(BoolVar, i64)>,
        lo: i64,
        hi: i64,
    ) {
        self.constraints.push(LinearConstraint {
            family: family.into(),
            terms,
            lo,
            hi,
        });
    }

    /// Adds `lo <= Σ vars <= hi`.
    pub fn add_sum_between(
        &mut self,
        family: impl Into<String>,
        vars: &[BoolVar],
        lo: i64,
        hi: i64,
    ) {
        let terms = vars.iter().map(|&v| (v, 1)).collect();
        self.add_linear(family, terms, lo, hi);
    }

    /// Adds `Σ vars == k`.
    pub fn add_sum_eq(&mut self, family: impl Into<String>, vars: &[BoolVar], k: i64) {
        self.add_sum_between(family, vars, k, k);
    }

    /// Adds `Σ vars <= k`.
    pub fn add_sum_le(&mut self, family: impl Into<String>, vars: &[BoolVar], k: i64) {
        self.add_sum_between(family, vars, i64::MIN / 4, k);
    }

    /// Adds `Σ vars >= k`.
    pub fn add_sum_ge(&mut self, family: impl Into<String>, vars: &[BoolVar], k: i64) {
        self.add_sum_between(family, vars, k, i64::MAX / 4);
    }

    /// Fixes a variable to a value.
    pub fn fix(&mut self, family: impl Into<String>, var: BoolVar, value: bool) {
        let v = i64::from(value);
        self.add_linear(family, vec![(var, 1)], v, v);
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = objective;
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.var_names.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Constraints in insertion order.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// The objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Distinct constraint families in order of first appearance.
    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> = Vec::new();
        for c in &self.constraints {
            if !families.contains(&c.family) {
                families.push(c.family.clone());
            }
        }
        families
    }

    /// Whether a full assignment satisfies every constraint.
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        values.len() == self.var_count()
            && self.constraints.iter().all(|c| c.is_satisfied_by(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model() {
        let mut model = CpModel::new("m");
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        model.add_sum_eq("pair", &[a, b], 1);
        model.fix("pin", a, true);

        assert_eq!(model.var_count(), 2);
        assert_eq!(model.constraint_count(), 2);
        assert_eq!(model.var_name(b), "b");
        assert!(model.is_satisfied_by(&[true, false]));
        assert!(!model.is_satisfied_by(&[false, true]));
        assert!(!model.is_satisfied_by(&[true]));
    }

    #[test]
    fn test_objective_evaluate() {
        let mut model = CpModel::new("m");
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        let objective = Objective::Minimize(vec![(a, 3), (b, -1)]);
        assert_eq!(objective.evaluate(&[true, true]), 2);
        assert_eq!(objective.evaluate(&[false, true]), -1);
        assert_eq!(Objective::Satisfy.evaluate(&[true, true]), 0);
        model.set_objective(objective);
        assert!(matches!(model.objective(), Objective::Minimize(_)));
    }

    #[test]
    fn test_families_in_order() {
        let mut model = CpModel::new("m");
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        model.add_sum_le("cap", &[a, b], 1);
        model.fix("pin", a, true);
        model.add_sum_ge("cap", &[a, b], 1);
        assert_eq!(model.families(), vec!["cap".to_string(), "pin".to_string()]);
    }

    #[test]
    fn test_activity_range() {
        let mut model = CpModel::new("m");
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        model.add_linear("mixed", vec![(a, 2), (b, -3)], -1, 1);
        assert_eq!(model.constraints()[0].activity_range(), (-3, 2));
    }
}
