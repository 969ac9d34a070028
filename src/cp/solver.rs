//! Mixed-integer engine backed by `good_lp`.
//!
//! # Algorithm
//!
//! Every [`CpModel`] is translated into a 0/1 integer program and handed to
//! the `microlp` backend (dual simplex with branch-and-bound).
//!
//! 1. **Feasibility pass**: the model without its objective. Failure here
//!    proves infeasibility.
//! 2. **Optimisation pass**: the model with its objective. When the budget
//!    expires first, the feasibility-pass assignment is kept and reported
//!    as [`SolveStatus::Feasible`].
//! 3. **Diagnosis**: on infeasibility, constraint families are dropped one
//!    at a time, most recently added first. The first family whose removal
//!    restores feasibility is reported as the conflict.
//!
//! The seed permutes the order in which variables and constraints reach
//! the backend, which selects among equally good assignments.
//!
//! The backend cannot be interrupted: each pass runs on a worker thread and
//! the wall-clock budget is enforced by waiting on its result. A pass that
//! outlives the budget is abandoned.
//!
//! # Reference
//! - Wolsey (1998), "Integer Programming", Ch. 7 (branch and bound)
//! - Chinneck (2008), "Feasibility and Infeasibility in Optimization", Ch. 6

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::{BoolVar, CpModel, Objective};

/// Search budget and seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock budget per solve call (ms). `None` = unlimited.
    pub time_limit_ms: Option<u64>,
    /// Seed for the order in which the model reaches the backend.
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: Some(30_000),
            seed: 0,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Removes the time limit.
    pub fn without_time_limit(mut self) -> Self {
        self.time_limit_ms = None;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Search completed; the returned assignment is optimal.
    Optimal,
    /// Budget expired after at least one solution was found.
    Feasible,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// Budget expired before any solution was found.
    Timeout,
}

/// Result of a solve call.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Outcome.
    pub status: SolveStatus,
    /// Variable values (empty unless a solution was found).
    pub values: Vec<bool>,
    /// Objective value of `values`.
    pub objective: Option<i64>,
    /// Constraint family the engine flags as conflicting, if any.
    pub conflict_family: Option<String>,
    /// Wall time spent.
    pub elapsed: Duration,
}

impl CpSolution {
    /// Whether an assignment is available.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    /// Value of a variable. `false` when no solution was found.
    pub fn value(&self, var: BoolVar) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }
}

/// Solving engine interface: model in, status and assignment out.
pub trait CpSolver {
    /// Solves `model` within the budget of `config`.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Default engine: `good_lp` with the pure-Rust `microlp` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }
}

/// Result of one backend pass.
enum Pass {
    Solved(Vec<bool>),
    Infeasible,
    Failed(String),
}

impl CpSolver for MilpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let deadline = config
            .time_limit_ms
            .map(|ms| started + Duration::from_millis(ms));
        let shared = Arc::new(model.clone());
        let seed = config.seed;

        let finish = |status: SolveStatus, values: Vec<bool>, conflict_family: Option<String>| {
            let objective = matches!(status, SolveStatus::Optimal | SolveStatus::Feasible)
                .then(|| model.objective().evaluate(&values));
            CpSolution {
                status,
                values,
                objective,
                conflict_family,
                elapsed: started.elapsed(),
            }
        };

        let first = {
            let model = Arc::clone(&shared);
            run_until(deadline, move || run_pass(&model, false, None, seed))
        };
        let values = match first {
            None => return finish(SolveStatus::Timeout, Vec::new(), None),
            Some(Pass::Solved(values)) => values,
            Some(Pass::Infeasible) => {
                let family = diagnose(&shared, deadline, seed);
                debug!(model = model.name(), family = ?family, "model infeasible");
                return finish(SolveStatus::Infeasible, Vec::new(), family);
            }
            Some(Pass::Failed(reason)) => {
                warn!(model = model.name(), %reason, "backend failed");
                return finish(SolveStatus::Infeasible, Vec::new(), None);
            }
        };

        if is_proven_optimal(model.objective(), &values) {
            return finish(SolveStatus::Optimal, values, None);
        }

        let second = {
            let model = Arc::clone(&shared);
            run_until(deadline, move || run_pass(&model, true, None, seed))
        };
        match second {
            Some(Pass::Solved(better)) => finish(SolveStatus::Optimal, better, None),
            Some(Pass::Infeasible) | Some(Pass::Failed(_)) | None => {
                debug!(model = model.name(), "optimisation pass did not finish");
                finish(SolveStatus::Feasible, values, None)
            }
        }
    }
}

/// A feasible assignment is optimal outright when the objective is absent,
/// or has only non-negative weights and evaluates to zero.
fn is_proven_optimal(objective: &Objective, values: &[bool]) -> bool {
    match objective {
        Objective::Satisfy => true,
        Objective::Minimize(terms) => {
            terms.iter().all(|&(_, w)| w >= 0) && objective.evaluate(values) == 0
        }
    }
}

/// Drops families one at a time, latest first, until the model becomes
/// feasible.
fn diagnose(model: &Arc<CpModel>, deadline: Option<Instant>, seed: u64) -> Option<String> {
    let families = model.families();
    if families.len() < 2 {
        return families.into_iter().next();
    }
    for family in families.into_iter().rev() {
        let shared = Arc::clone(model);
        let skipped = family.clone();
        match run_until(deadline, move || run_pass(&shared, false, Some(skipped.as_str()), seed)) {
            Some(Pass::Solved(_)) => return Some(family),
            Some(_) => continue,
            None => return None,
        }
    }
    None
}

/// Runs `job` on a worker thread and waits until `deadline`.
fn run_until<T, F>(deadline: Option<Instant>, job: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(deadline) = deadline else {
        return Some(job());
    };
    let now = Instant::now();
    if now >= deadline {
        return None;
    }
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(job());
    });
    rx.recv_timeout(deadline - now).ok()
}

fn linear(terms: &[(BoolVar, i64)], vars: &[Variable]) -> Expression {
    let mut expr = Expression::with_capacity(terms.len());
    for &(var, coef) in terms {
        expr.add_mul(coef as f64, vars[var.index()]);
    }
    expr
}

/// One backend call over the 0/1 translation of `model`.
fn run_pass(model: &CpModel, with_objective: bool, skip: Option<&str>, seed: u64) -> Pass {
    if model.var_count() == 0 {
        return if model.is_satisfied_by(&[]) {
            Pass::Solved(Vec::new())
        } else {
            Pass::Infeasible
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..model.var_count()).collect();
    order.shuffle(&mut rng);

    let mut problem_vars = ProblemVariables::new();
    let mut handles: Vec<(usize, Variable)> = order
        .into_iter()
        .map(|i| (i, problem_vars.add(variable().binary())))
        .collect();
    handles.sort_unstable_by_key(|&(i, _)| i);
    let vars: Vec<Variable> = handles.into_iter().map(|(_, v)| v).collect();

    let objective = match model.objective() {
        Objective::Minimize(terms) if with_objective => linear(terms, &vars),
        _ => Expression::from(0.0),
    };
    let mut problem = problem_vars.minimise(objective).using(default_solver);

    let mut constraints: Vec<_> = model
        .constraints()
        .iter()
        .filter(|c| skip != Some(c.family.as_str()))
        .collect();
    constraints.shuffle(&mut rng);
    for c in constraints {
        let (least, most) = c.activity_range();
        let expr = linear(&c.terms, &vars);
        let (lo, hi) = (c.lo as f64, c.hi as f64);
        if c.lo == c.hi {
            problem = problem.with(constraint!(expr == lo));
            continue;
        }
        if c.lo > least {
            problem = problem.with(constraint!(expr.clone() >= lo));
        }
        if c.hi < most {
            problem = problem.with(constraint!(expr <= hi));
        }
    }

    match problem.solve() {
        Ok(solution) => Pass::Solved(vars.iter().map(|&v| solution.value(v) > 0.5).collect()),
        Err(ResolutionError::Infeasible) => Pass::Infeasible,
        Err(other) => Pass::Failed(other.to_string()),
    }
}
