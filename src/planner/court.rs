//! Court stage: team split and court assignment of every unit.
//!
//! # Formulation
//!
//! Two independent engine calls.
//!
//! **Team split.** Variables `split[u][k]` choose one of the three 2–2
//! splits of unit `u` (`team-split`). For every pair, the splits that would
//! make them partners are summed over the whole schedule and capped at one
//! (`partner-uniqueness`). Teams already stored on the units are replaced,
//! unless `keep_teams` is set, in which case they are pinned (`fixed-team`).
//!
//! **Court assignment.** Variables `court[r][g][c]` form a bijection between
//! the units and the courts of every round (`court-bijection`). For every
//! player and court, usage outside `[floor(n/C), ceil(n/C)]` (`n` = rounds
//! played) is charged through ordered penalty indicators, the k-th unit of
//! deviation costing `k`. Courts are interchangeable, so the first round is
//! pinned to unit `g` on court `g` (`court-symmetry`).
//!
//! # Reference
//! Burkard, Dell'Amico & Martello (2012), "Assignment Problems", Ch. 5
//! (balanced assignment)

use std::collections::BTreeMap;

use tracing::debug;

use super::{accept, log_stage};
use crate::cp::{BoolVar, CpModel, CpSolver, Objective};
use crate::error::PlanError;
use crate::models::{PlayerId, RotationConfig, Schedule, Stage, StageOutcome, Team, Unit};

/// Builds and solves the team-split and court-assignment models.
pub struct CourtPlanner<'a> {
    config: &'a RotationConfig,
}

impl<'a> CourtPlanner<'a> {
    /// Creates a court planner.
    pub fn new(config: &'a RotationConfig) -> Self {
        Self { config }
    }

    /// Solves the court stage for a schedule with complete group layers.
    ///
    /// # Returns
    /// The units of every round with teams and courts set, and the combined
    /// engine outcome.
    ///
    /// # Errors
    /// `Infeasible` naming the group stage when no split avoids repeated
    /// partners: the grouping put some pair together too often.
    pub fn solve<S: CpSolver>(
        &self,
        solver: &S,
        schedule: &Schedule,
    ) -> Result<(Vec<Vec<Unit>>, StageOutcome), PlanError> {
        let (split_model, splits) = self.build_splits_vars(schedule);
        debug!(
            vars = split_model.var_count(),
            constraints = split_model.constraint_count(),
            "team split model built"
        );
        let solution = solver.solve(&split_model, &self.config.solver);
        let mut outcome = accept(Stage::Court, Stage::Group, &solution)?;
        let teams: Vec<Vec<[Team; 2]>> = schedule
            .rounds
            .iter()
            .zip(&splits)
            .map(|(round, vars)| {
                round
                    .units
                    .iter()
                    .zip(vars)
                    .map(|(unit, choice)| {
                        let k = choice.iter().position(|&v| solution.value(v)).unwrap_or(0);
                        unit.splits()[k]
                    })
                    .collect()
            })
            .collect();

        let (court_model, courts) = self.build_courts_vars(schedule);
        debug!(
            vars = court_model.var_count(),
            constraints = court_model.constraint_count(),
            "court model built"
        );
        let solution = solver.solve(&court_model, &self.config.solver);
        outcome.absorb(&accept(Stage::Court, Stage::Court, &solution)?);
        log_stage(Stage::Court, &outcome);

        let units = schedule
            .rounds
            .iter()
            .zip(&courts)
            .zip(&teams)
            .map(|((round, vars), teams)| {
                round
                    .units
                    .iter()
                    .zip(vars)
                    .zip(teams)
                    .map(|((unit, choice), &split)| {
                        let court = choice.iter().position(|&v| solution.value(v)).unwrap_or(0);
                        Unit::new(unit.players).with_teams(split).with_court(court)
                    })
                    .collect()
            })
            .collect();
        Ok((units, outcome))
    }

    /// Builds the team-split model.
    pub fn build_splits(&self, schedule: &Schedule) -> CpModel {
        self.build_splits_vars(schedule).0
    }

    fn build_splits_vars(&self, schedule: &Schedule) -> (CpModel, Vec<Vec<[BoolVar; 3]>>) {
        let mut model = CpModel::new("team-split");
        let mut partnered: BTreeMap<Team, Vec<BoolVar>> = BTreeMap::new();

        let vars: Vec<Vec<[BoolVar; 3]>> = schedule
            .rounds
            .iter()
            .map(|round| {
                round
                    .units
                    .iter()
                    .enumerate()
                    .map(|(g, unit)| {
                        let choice =
                            [0, 1, 2].map(|k| model.new_bool(format!("split[{}][{g}][{k}]", round.index)));
                        model.add_sum_eq("team-split", &choice, 1);
                        for (k, split) in unit.splits().into_iter().enumerate() {
                            for team in split {
                                partnered.entry(team).or_default().push(choice[k]);
                            }
                            if self.config.keep_teams
                                && unit.teams.is_some_and(|t| same_split(t, split))
                            {
                                model.fix("fixed-team", choice[k], true);
                            }
                        }
                        choice
                    })
                    .collect()
            })
            .collect();

        for options in partnered.values().filter(|v| v.len() > 1) {
            model.add_sum_le("partner-uniqueness", options, 1);
        }
        (model, vars)
    }

    /// Builds the court-assignment model.
    pub fn build_courts(&self, schedule: &Schedule) -> CpModel {
        self.build_courts_vars(schedule).0
    }

    fn build_courts_vars(&self, schedule: &Schedule) -> (CpModel, Vec<Vec<Vec<BoolVar>>>) {
        let courts = self.config.court_count;
        let mut model = CpModel::new("court-assignment");
        let mut usage: Vec<Vec<Vec<BoolVar>>> =
            vec![vec![Vec::new(); courts]; self.config.player_count];

        let vars: Vec<Vec<Vec<BoolVar>>> = schedule
            .rounds
            .iter()
            .map(|round| {
                let grid: Vec<Vec<BoolVar>> = (0..round.units.len())
                    .map(|g| {
                        (0..courts)
                            .map(|c| model.new_bool(format!("court[{}][{g}][{c}]", round.index)))
                            .collect()
                    })
                    .collect();
                for row in &grid {
                    model.add_sum_eq("court-bijection", row, 1);
                }
                for c in 0..courts {
                    let column: Vec<BoolVar> = grid.iter().map(|row| row[c]).collect();
                    model.add_sum_eq("court-bijection", &column, 1);
                }
                for (unit, row) in round.units.iter().zip(&grid) {
                    for &player in &unit.players {
                        for (c, &v) in row.iter().enumerate() {
                            usage[player][c].push(v);
                        }
                    }
                }
                grid
            })
            .collect();

        if let Some(first) = vars.first() {
            for (g, row) in first.iter().enumerate() {
                model.fix("court-symmetry", row[g], true);
            }
        }

        let mut penalties = Vec::new();
        for (player, per_court) in usage.iter().enumerate() {
            let played = per_court.first().map_or(0, Vec::len);
            let low = played / courts;
            let high = played.div_ceil(courts);
            for (c, uses) in per_court.iter().enumerate() {
                let over = ordered_penalties(&mut model, player, c, "over", played - high);
                if !over.is_empty() {
                    let mut terms: Vec<(BoolVar, i64)> = uses.iter().map(|&v| (v, 1)).collect();
                    terms.extend(over.iter().map(|&v| (v, -1)));
                    model.add_linear("court-balance", terms, i64::MIN / 4, high as i64);
                }
                let under = ordered_penalties(&mut model, player, c, "under", low);
                if !under.is_empty() {
                    let mut terms: Vec<(BoolVar, i64)> = uses.iter().map(|&v| (v, 1)).collect();
                    terms.extend(under.iter().map(|&v| (v, 1)));
                    model.add_linear("court-balance", terms, low as i64, i64::MAX / 4);
                }
                for side in [&over, &under] {
                    penalties.extend(side.iter().enumerate().map(|(k, &v)| (v, k as i64 + 1)));
                }
            }
        }
        if !penalties.is_empty() {
            model.set_objective(Objective::Minimize(penalties));
        }
        (model, vars)
    }
}

fn same_split(a: [Team; 2], b: [Team; 2]) -> bool {
    a == b || a == [b[1], b[0]]
}

fn ordered_penalties(
    model: &mut CpModel,
    player: PlayerId,
    court: usize,
    side: &str,
    len: usize,
) -> Vec<BoolVar> {
    let vars: Vec<BoolVar> = (0..len)
        .map(|k| model.new_bool(format!("{side}[{player}][{court}][{k}]")))
        .collect();
    for pair in vars.windows(2) {
        model.add_linear("court-balance-order", vec![(pair[1], 1), (pair[0], -1)], i64::MIN / 4, 0);
    }
    vars
}
