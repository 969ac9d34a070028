//! Three-stage rotation planning.
//!
//! Each stage reads the schedule produced by the previous one, builds a
//! [`CpModel`](crate::cp::CpModel) for its own decision, hands it to a
//! [`CpSolver`] and writes its layer back into a fresh copy of the schedule.
//! Stages are independently re-runnable: the persisted schedule between
//! stages is the only state.
//!
//! # Algorithm
//!
//! | Stage | Decides | Hard constraints | Objective |
//! |-------|---------|------------------|-----------|
//! | `BenchPlanner` | who sits out each round | bench size, bench bounds, cooldown | flat bench histogram |
//! | `GroupPlanner` | units of four per round | partition, co-occurrence cap | distinct unit-mates |
//! | `CourtPlanner` | team split and court per unit | partner uniqueness, court bijection | balanced court usage |
//!
//! An engine run that ends with its budget spent but a solution in hand is
//! accepted and recorded as suboptimal. Anything else is returned as a
//! [`PlanError`]; no stage relaxes a constraint on its own.
//!
//! # References
//!
//! - Lewis (2016), "A Guide to Graph Colouring", Ch. 9 (social golfer problem)
//! - Harvey (2002), "The Fully Social Golfer Problem"

mod bench;
mod court;
mod group;

pub use bench::BenchPlanner;
pub use court::CourtPlanner;
pub use group::GroupPlanner;

use tracing::{info, warn};

use crate::cp::{CpSolution, CpSolver, MilpSolver, SolveStatus};
use crate::error::PlanError;
use crate::models::{RotationConfig, Schedule, Stage, StageOutcome};
use crate::validation::{validate_config, validate_schedule};

/// Runs the bench stage with the bundled engine.
pub fn run_bench_planner(
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    run_bench_planner_with(&MilpSolver::new(), schedule, config)
}

/// Runs the bench stage with `solver`.
///
/// Any existing group and court layers are discarded.
pub fn run_bench_planner_with<S: CpSolver>(
    solver: &S,
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    check_dimensions(schedule, config)?;
    let (benches, outcome) = BenchPlanner::new(config).solve(solver)?;
    let mut planned = schedule.clone();
    planned.set_bench(benches, outcome);
    Ok(planned)
}

/// Runs the group stage with the bundled engine.
pub fn run_group_planner(
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    run_group_planner_with(&MilpSolver::new(), schedule, config)
}

/// Runs the group stage with `solver`.
///
/// Requires a complete bench layer. Any existing court layer is discarded.
pub fn run_group_planner_with<S: CpSolver>(
    solver: &S,
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    check_dimensions(schedule, config)?;
    if !schedule.has_bench() {
        return Err(PlanError::StagePrecondition {
            stage: Stage::Group,
            message: "the schedule has no complete bench layer; run the bench stage first".into(),
        });
    }
    check_input(schedule, config, Stage::Group)?;
    let (groups, outcome) = GroupPlanner::new(config).solve(solver, schedule)?;
    let mut planned = schedule.clone();
    planned.set_groups(groups, outcome);
    Ok(planned)
}

/// Runs the court stage with the bundled engine.
pub fn run_court_planner(
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    run_court_planner_with(&MilpSolver::new(), schedule, config)
}

/// Runs the court stage with `solver`.
///
/// Requires complete bench and group layers.
pub fn run_court_planner_with<S: CpSolver>(
    solver: &S,
    schedule: &Schedule,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    check_dimensions(schedule, config)?;
    if !schedule.has_groups() {
        return Err(PlanError::StagePrecondition {
            stage: Stage::Court,
            message: "the schedule has no complete group layer; run the group stage first".into(),
        });
    }
    check_input(schedule, config, Stage::Court)?;
    let (units, outcome) = CourtPlanner::new(config).solve(solver, schedule)?;
    let mut planned = schedule.clone();
    planned.set_courts(units, outcome);
    Ok(planned)
}

/// Runs all three stages from scratch with the bundled engine.
pub fn run_pipeline(config: &RotationConfig) -> Result<Schedule, PlanError> {
    run_pipeline_with(&MilpSolver::new(), config)
}

/// Runs all three stages from scratch with `solver`.
pub fn run_pipeline_with<S: CpSolver>(
    solver: &S,
    config: &RotationConfig,
) -> Result<Schedule, PlanError> {
    let schedule = Schedule::empty(config);
    let schedule = run_bench_planner_with(solver, &schedule, config)?;
    let schedule = run_group_planner_with(solver, &schedule, config)?;
    run_court_planner_with(solver, &schedule, config)
}

fn check_dimensions(schedule: &Schedule, config: &RotationConfig) -> Result<(), PlanError> {
    validate_config(config)?;
    if !schedule.matches(config) {
        return Err(PlanError::InvalidConfiguration(format!(
            "schedule was planned for {} players, {} courts and {} rounds, configuration has {}, {} and {}",
            schedule.player_count,
            schedule.court_count,
            schedule.round_count,
            config.player_count,
            config.court_count,
            config.round_count
        )));
    }
    Ok(())
}

/// Rejects prior-stage layers that break their own invariants.
fn check_input(schedule: &Schedule, config: &RotationConfig, stage: Stage) -> Result<(), PlanError> {
    match validate_schedule(schedule, config) {
        Ok(()) => Ok(()),
        Err(errors) => Err(PlanError::StagePrecondition {
            stage,
            message: errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }),
    }
}

/// Maps an engine result onto the stage outcome or error.
pub(crate) fn accept(
    stage: Stage,
    implicated: Stage,
    solution: &CpSolution,
) -> Result<StageOutcome, PlanError> {
    match solution.status {
        SolveStatus::Optimal | SolveStatus::Feasible => {
            let outcome = StageOutcome::from_solution(solution);
            if outcome.suboptimal {
                warn!(
                    %stage,
                    objective = ?outcome.objective,
                    elapsed_ms = outcome.elapsed_ms,
                    "search budget spent before optimality was proven; keeping best solution"
                );
            }
            Ok(outcome)
        }
        SolveStatus::Infeasible => Err(PlanError::Infeasible {
            stage,
            family: solution.conflict_family.clone(),
            implicated,
        }),
        SolveStatus::Timeout => Err(PlanError::Timeout {
            stage,
            elapsed_ms: solution.elapsed.as_millis() as u64,
        }),
    }
}

pub(crate) fn log_stage(stage: Stage, outcome: &StageOutcome) {
    info!(
        %stage,
        status = ?outcome.status,
        objective = ?outcome.objective,
        elapsed_ms = outcome.elapsed_ms,
        "stage planned"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::SolverConfig;
    use crate::models::Unit;

    fn config(p: usize, c: usize, r: usize) -> RotationConfig {
        RotationConfig::new(p, c, r)
            .with_solver(SolverConfig::default().with_time_limit_ms(20_000).with_seed(7))
    }

    #[test]
    fn test_group_requires_bench() {
        let config = config(8, 2, 3);
        let err = run_group_planner(&Schedule::empty(&config), &config).unwrap_err();
        assert!(matches!(
            err,
            PlanError::StagePrecondition {
                stage: Stage::Group,
                ..
            }
        ));
    }

    #[test]
    fn test_court_requires_groups() {
        let config = config(9, 2, 3);
        let benched = run_bench_planner(&Schedule::empty(&config), &config).unwrap();
        let err = run_court_planner(&benched, &config).unwrap_err();
        assert!(matches!(
            err,
            PlanError::StagePrecondition {
                stage: Stage::Court,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_player_rejected() {
        let config = config(5, 1, 1);
        let mut schedule = Schedule::empty(&config);
        schedule.set_bench(vec![vec![4]], StageOutcome::trivial());
        schedule.set_groups(vec![vec![Unit::new([0, 1, 2, 9])]], StageOutcome::trivial());
        let err = run_court_planner(&schedule, &config).unwrap_err();
        assert!(matches!(
            err,
            PlanError::StagePrecondition {
                stage: Stage::Court,
                ..
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let config = config(9, 2, 3);
        let other = RotationConfig::new(10, 2, 3);
        let err = run_bench_planner(&Schedule::empty(&other), &config).unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_invalid_config_before_engine() {
        let config = RotationConfig::new(6, 1, 1).with_cooldown(2);
        let err = run_bench_planner(&Schedule::empty(&config), &config).unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_pipeline_small() {
        let config = config(10, 2, 5);
        let schedule = run_pipeline(&config).unwrap();
        assert!(schedule.has_courts());
        assert_eq!(validate_schedule(&schedule, &config), Ok(()));
    }

    #[test]
    fn test_corrupted_bench_rejected() {
        let config = config(9, 2, 3);
        let mut benched = run_bench_planner(&Schedule::empty(&config), &config).unwrap();
        benched.rounds[1].bench = benched.rounds[0].bench.clone();
        let err = run_group_planner(&benched, &config).unwrap_err();
        assert!(matches!(err, PlanError::StagePrecondition { .. }));
    }

    #[test]
    fn test_accept_maps_status() {
        let mut solution = CpSolution {
            status: SolveStatus::Infeasible,
            values: Vec::new(),
            objective: None,
            conflict_family: Some("team-split".into()),
            elapsed: std::time::Duration::from_millis(5),
        };
        match accept(Stage::Court, Stage::Group, &solution) {
            Err(PlanError::Infeasible {
                family, implicated, ..
            }) => {
                assert_eq!(family.as_deref(), Some("team-split"));
                assert_eq!(implicated, Stage::Group);
            }
            other => panic!("unexpected {other:?}"),
        }

        solution.status = SolveStatus::Timeout;
        assert!(matches!(
            accept(Stage::Bench, Stage::Bench, &solution),
            Err(PlanError::Timeout { elapsed_ms: 5, .. })
        ));

        solution.status = SolveStatus::Feasible;
        solution.objective = Some(4);
        let outcome = accept(Stage::Bench, Stage::Bench, &solution).unwrap();
        assert!(outcome.suboptimal);
        assert_eq!(outcome.objective, Some(4));
    }
}
