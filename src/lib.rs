//! Doubles rotation planning for the U-Engine ecosystem.
//!
//! Plans a session of doubles play (tennis, padel, badminton): for `P`
//! players, `C` courts and `R` rounds it decides who sits out each round,
//! how the playing players form units of four, how each unit splits into
//! two teams, and which court each unit uses.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `RotationConfig`, `Schedule`, `Round`,
//!   `Unit`, `Team`, `PairCounter`, `PlayerStats`
//! - **`cp`**: Boolean constraint model and its MILP adapter (`good_lp` over `microlp`)
//! - **`planner`**: The three stages (`BenchPlanner`, `GroupPlanner`,
//!   `CourtPlanner`) and their entry points
//! - **`validation`**: Configuration checks and independent schedule checks
//! - **`kpi`**: Fairness and variety metrics
//! - **`store`**: JSON state file between stages
//! - **`display`**: Plain-text tables
//!
//! # Architecture
//!
//! Stages communicate only through the persisted [`models::Schedule`]. Each
//! stage builds a [`cp::CpModel`] and solves it with any [`cp::CpSolver`],
//! so the engine can be swapped without touching the formulations.
//!
//! # References
//!
//! - Harvey (2002), "The Fully Social Golfer Problem"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"
//! - Lewis (2016), "A Guide to Graph Colouring", Ch. 9

pub mod cp;
pub mod display;
pub mod error;
pub mod kpi;
pub mod models;
pub mod planner;
pub mod store;
pub mod validation;

pub use error::PlanError;
pub use planner::{
    run_bench_planner, run_bench_planner_with, run_court_planner, run_court_planner_with,
    run_group_planner, run_group_planner_with, run_pipeline, run_pipeline_with,
};
