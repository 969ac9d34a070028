//! Configuration and schedule validation.
//!
//! [`validate_config`] rejects structurally impossible inputs before any
//! engine call. [`validate_schedule`] re-checks every invariant of a
//! (possibly partial) schedule independently of the planners that built it:
//! - Each round partitions the roster into the bench and `C` units of four
//! - Bench sizes, per-player bench bounds and the rebench cooldown
//! - The co-occurrence cap and partner uniqueness
//! - Rounds played differ by at most one between players
//! - Court bijection per round
//!
//! Only the layers present in the schedule are checked.
//!
//! # Reference
//! Lewis (2016), "A Guide to Graph Colouring", Ch. 1.2 (partition feasibility)

use std::collections::HashSet;

use crate::error::PlanError;
use crate::models::{PairCounter, RotationConfig, Schedule, PLAYERS_PER_UNIT};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Schedule dimensions differ from the configuration.
    DimensionMismatch,
    /// A round does not partition the roster.
    RoundPartition,
    /// A unit does not hold four distinct players, or its teams do not split it.
    UnitShape,
    /// A player's bench count is outside the bounds.
    BenchFrequency,
    /// A player was benched again before the cooldown elapsed.
    RebenchCooldown,
    /// A pair shared a unit more often than the cap allows.
    CoOccurrenceCap,
    /// A pair partnered more than once.
    RepeatedPartner,
    /// Rounds played differ too much between players.
    PlayingTimeSpread,
    /// Courts of a round are not a bijection onto `0..C`.
    CourtAssignment,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Rejects configurations no schedule can satisfy.
///
/// Checks:
/// 1. `P >= 4`, `C >= 1`, `4C <= P`, `R >= 1`
/// 2. An explicit cooldown is shorter than the schedule
/// 3. The co-occurrence cap is at least 1
/// 4. Objective weights are non-negative
/// 5. The bench bounds are reachable under the cooldown
pub fn validate_config(config: &RotationConfig) -> Result<(), PlanError> {
    let invalid = |msg: String| Err(PlanError::InvalidConfiguration(msg));
    let p = config.player_count;
    let c = config.court_count;
    let r = config.round_count;

    if p < PLAYERS_PER_UNIT {
        return invalid(format!("{p} players cannot fill a court of {PLAYERS_PER_UNIT}"));
    }
    if c == 0 {
        return invalid("at least one court is required".into());
    }
    if config.playing_slots() > p {
        return invalid(format!(
            "{c} courts need {} players but only {p} are registered",
            config.playing_slots()
        ));
    }
    if r == 0 {
        return invalid("at least one round is required".into());
    }
    if let Some(d) = config.min_games_before_rebench {
        if d >= r {
            return invalid(format!(
                "rebench cooldown of {d} rounds must be shorter than the {r}-round schedule"
            ));
        }
    }
    if config.co_occurrence_cap() == 0 {
        return invalid("co-occurrence cap must be at least 1".into());
    }
    if config.repeat_weight < 0 || config.coverage_weight < 0 || config.bench_pair_weight < 0 {
        return invalid("objective weights must be non-negative".into());
    }

    let b = config.bench_size();
    if b == 0 {
        return Ok(());
    }
    let bounds = config.bench_bounds();
    let d = config.cooldown();
    let capacity = config.bench_capacity();
    if bounds.min > capacity {
        return invalid(format!(
            "each player must sit out {} times but a cooldown of {d} allows at most {capacity} in {r} rounds",
            bounds.min
        ));
    }
    let reachable = p * bounds.max.min(capacity);
    if r * b > reachable {
        return invalid(format!(
            "{} bench slots exceed the {reachable} reachable under bench bound {} and cooldown {d}",
            r * b,
            bounds.max
        ));
    }
    if r * b < p * bounds.min {
        return invalid(format!(
            "{} bench slots cannot give every player {} bench turns",
            r * b,
            bounds.min
        ));
    }
    let window = (d + 1).min(r);
    if window * b > p {
        return invalid(format!(
            "a cooldown window of {window} rounds needs {} distinct benched players but only {p} exist",
            window * b
        ));
    }
    Ok(())
}

/// Checks every invariant of the layers present in `schedule`.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_schedule(schedule: &Schedule, config: &RotationConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !schedule.matches(config) {
        errors.push(ValidationError::new(
            ValidationErrorKind::DimensionMismatch,
            format!(
                "schedule is {}P/{}C/{}R, configuration is {}P/{}C/{}R",
                schedule.player_count,
                schedule.court_count,
                schedule.round_count,
                config.player_count,
                config.court_count,
                config.round_count
            ),
        ));
        return Err(errors);
    }
    if schedule.rounds.is_empty() {
        return Ok(());
    }
    if schedule.rounds.len() != config.round_count {
        errors.push(ValidationError::new(
            ValidationErrorKind::RoundPartition,
            format!(
                "expected {} rounds, found {}",
                config.round_count,
                schedule.rounds.len()
            ),
        ));
        return Err(errors);
    }

    check_rounds(schedule, config, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }
    check_bench(schedule, config, &mut errors);
    if schedule.rounds.iter().all(|r| !r.units.is_empty()) {
        check_co_occurrence(schedule, config, &mut errors);
    }
    check_partners(schedule, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rounds(schedule: &Schedule, config: &RotationConfig, errors: &mut Vec<ValidationError>) {
    let p = config.player_count;
    for (r, round) in schedule.rounds.iter().enumerate() {
        if round.index != r {
            errors.push(ValidationError::new(
                ValidationErrorKind::RoundPartition,
                format!("round at position {r} carries index {}", round.index),
            ));
        }
        if round.bench.len() != config.bench_size() {
            errors.push(ValidationError::new(
                ValidationErrorKind::RoundPartition,
                format!(
                    "round {r}: {} benched, expected {}",
                    round.bench.len(),
                    config.bench_size()
                ),
            ));
        }

        let mut seen = HashSet::new();
        for &player in &round.bench {
            if player >= p || !seen.insert(player) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::RoundPartition,
                    format!("round {r}: bench entry {player} is out of range or repeated"),
                ));
            }
        }
        if round.units.is_empty() {
            continue;
        }

        if round.units.len() != config.court_count {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnitShape,
                format!(
                    "round {r}: {} units, expected {}",
                    round.units.len(),
                    config.court_count
                ),
            ));
        }
        let mut courts = HashSet::new();
        for unit in &round.units {
            let distinct: HashSet<_> = unit.players.iter().collect();
            if distinct.len() != PLAYERS_PER_UNIT {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnitShape,
                    format!("round {r}: unit {:?} repeats a player", unit.players),
                ));
            }
            for &player in &unit.players {
                if player >= p || !seen.insert(player) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::RoundPartition,
                        format!("round {r}: player {player} is out of range or placed twice"),
                    ));
                }
            }
            if let Some(teams) = unit.teams {
                let mut members = [teams[0].0, teams[0].1, teams[1].0, teams[1].1];
                members.sort_unstable();
                if members != unit.players {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnitShape,
                        format!("round {r}: teams {teams:?} do not split unit {:?}", unit.players),
                    ));
                }
            }
            if let Some(court) = unit.court {
                if court >= config.court_count || !courts.insert(court) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::CourtAssignment,
                        format!("round {r}: court {court} is out of range or used twice"),
                    ));
                }
            }
        }
        if seen.len() != p {
            errors.push(ValidationError::new(
                ValidationErrorKind::RoundPartition,
                format!("round {r}: {} of {p} players placed", seen.len()),
            ));
        }
        let assigned = round.units.iter().filter(|u| u.court.is_some()).count();
        if assigned != 0 && assigned != round.units.len() {
            errors.push(ValidationError::new(
                ValidationErrorKind::CourtAssignment,
                format!("round {r}: only {assigned} units have a court"),
            ));
        }
    }
}

fn check_bench(schedule: &Schedule, config: &RotationConfig, errors: &mut Vec<ValidationError>) {
    let p = config.player_count;
    let bounds = config.bench_bounds();
    let d = config.cooldown();
    let mut counts = vec![0usize; p];
    let mut last: Vec<Option<usize>> = vec![None; p];

    for (r, round) in schedule.rounds.iter().enumerate() {
        for &player in round.bench.iter().filter(|&&q| q < p) {
            counts[player] += 1;
            if let Some(prev) = last[player] {
                if r - prev <= d {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::RebenchCooldown,
                        format!(
                            "player {player} benched in rounds {prev} and {r}, cooldown is {d}"
                        ),
                    ));
                }
            }
            last[player] = Some(r);
        }
    }

    for (player, &count) in counts.iter().enumerate() {
        if count < bounds.min || count > bounds.max {
            errors.push(ValidationError::new(
                ValidationErrorKind::BenchFrequency,
                format!(
                    "player {player} benched {count} times, bounds are [{}, {}]",
                    bounds.min, bounds.max
                ),
            ));
        }
    }

    let most = counts.iter().copied().max().unwrap_or(0);
    let least = counts.iter().copied().min().unwrap_or(0);
    if most - least > 1 {
        errors.push(ValidationError::new(
            ValidationErrorKind::PlayingTimeSpread,
            format!("rounds played range over {}, allowed 1", most - least),
        ));
    }
}

fn check_co_occurrence(
    schedule: &Schedule,
    config: &RotationConfig,
    errors: &mut Vec<ValidationError>,
) {
    let cap = config.co_occurrence_cap() as u32;
    let counter = PairCounter::co_occurrence(schedule);
    for (a, b, count) in counter.pairs().filter(|&(_, _, c)| c > cap) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CoOccurrenceCap,
            format!("players {a} and {b} share a unit {count} times, cap is {cap}"),
        ));
    }
}

fn check_partners(schedule: &Schedule, errors: &mut Vec<ValidationError>) {
    let counter = PairCounter::partners(schedule);
    for (a, b, count) in counter.pairs().filter(|&(_, _, c)| c > 1) {
        errors.push(ValidationError::new(
            ValidationErrorKind::RepeatedPartner,
            format!("players {a} and {b} partnered {count} times"),
        ));
    }
}
