//! Constraint-programming engine.
//!
//! The planners describe each stage as a [`CpModel`] (boolean variables,
//! linear constraints tagged with a family, an optional objective) and hand
//! it to any [`CpSolver`]. The engine answers with a [`CpSolution`] whose
//! [`SolveStatus`] distinguishes proven optimality, budget-limited
//! feasibility, proven infeasibility and budget expiry without a solution.
//!
//! [`MilpSolver`] is the bundled engine: the model is translated into a 0/1
//! integer program and solved by `good_lp` over the `microlp` backend.
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod solver;

pub use model::{BoolVar, CpModel, LinearConstraint, Objective};
pub use solver::{CpSolution, CpSolver, MilpSolver, SolveStatus, SolverConfig};
