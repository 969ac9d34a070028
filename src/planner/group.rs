//! Group stage: splitting each round's playing players into units of four.
//!
//! # Formulation
//!
//! Variables `x[i][g]`: playing player `i` of a round is in unit `g`.
//! - `unit-partition`: every playing player is in exactly one unit
//! - `unit-size`: every unit holds exactly four players
//! - `symmetry`: the k-th playing player may only use units `0..=k`
//! - `co-occurrence-cap`: no pair shares a unit more than `cap` times
//!
//! `Rolling` solves one model per round in order. Pairs that already
//! reached the cap are kept apart; every other pair with history `h` costs
//! `repeat_weight · h²` when placed together again, which spreads unit-mates
//! as widely as possible.
//!
//! `Joint` solves all rounds at once with exact per-round co-occurrence
//! indicators and minimises the number of pairs that never share a unit.
//!
//! # Reference
//! Harvey (2002), "The Fully Social Golfer Problem"; Triska & Musliu (2012),
//! "An effective greedy heuristic for the Social Golfer Problem"

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use super::{accept, log_stage};
use crate::cp::{BoolVar, CpModel, CpSolver, Objective, SolverConfig};
use crate::error::PlanError;
use crate::models::{
    GroupStrategy, PairCounter, PlayerId, RotationConfig, Schedule, Stage, StageOutcome, Unit,
    PLAYERS_PER_UNIT,
};

/// Assignment variables of one round: `slots[i][g]` for `g <= i`.
struct RoundVars {
    playing: Vec<PlayerId>,
    slots: Vec<Vec<BoolVar>>,
}

impl RoundVars {
    fn new(model: &mut CpModel, round: usize, playing: Vec<PlayerId>, units: usize) -> Self {
        let slots: Vec<Vec<BoolVar>> = playing
            .iter()
            .enumerate()
            .map(|(i, &player)| {
                (0..units.min(i + 1))
                    .map(|g| model.new_bool(format!("x[{round}][{player}][{g}]")))
                    .collect()
            })
            .collect();

        for row in &slots {
            model.add_sum_eq("unit-partition", row, 1);
        }
        for g in 0..units {
            let column: Vec<BoolVar> = slots.iter().filter_map(|row| row.get(g).copied()).collect();
            model.add_sum_eq("unit-size", &column, PLAYERS_PER_UNIT as i64);
        }

        Self { playing, slots }
    }

    /// Unit variables shared by playing positions `i` and `j`.
    fn shared(&self, i: usize, j: usize) -> impl Iterator<Item = (BoolVar, BoolVar)> + '_ {
        self.slots[i].iter().copied().zip(self.slots[j].iter().copied())
    }

    fn decode(&self, values: impl Fn(BoolVar) -> bool, units: usize) -> Vec<Unit> {
        let mut members: Vec<Vec<PlayerId>> = vec![Vec::with_capacity(PLAYERS_PER_UNIT); units];
        for (&player, row) in self.playing.iter().zip(&self.slots) {
            if let Some(g) = row.iter().position(|&v| values(v)) {
                members[g].push(player);
            }
        }
        members
            .into_iter()
            .map(|m| {
                let mut players = [0; PLAYERS_PER_UNIT];
                for (slot, &p) in players.iter_mut().zip(&m) {
                    *slot = p;
                }
                Unit::new(players)
            })
            .collect()
    }
}

/// Builds and solves the group models.
pub struct GroupPlanner<'a> {
    config: &'a RotationConfig,
}

impl<'a> GroupPlanner<'a> {
    /// Creates a group planner.
    pub fn new(config: &'a RotationConfig) -> Self {
        Self { config }
    }

    /// Solves the group stage for a schedule with a complete bench layer.
    ///
    /// # Returns
    /// The units of every round and the combined engine outcome.
    pub fn solve<S: CpSolver>(
        &self,
        solver: &S,
        schedule: &Schedule,
    ) -> Result<(Vec<Vec<Unit>>, StageOutcome), PlanError> {
        let (groups, outcome) = match self.config.group_strategy {
            GroupStrategy::Rolling => self.solve_rolling(solver, schedule)?,
            GroupStrategy::Joint => self.solve_joint(solver, schedule)?,
        };
        log_stage(Stage::Group, &outcome);
        Ok((groups, outcome))
    }

    /// Builds the model of one round given the co-occurrence history so far.
    ///
    /// The model is a pure function of the roster, the configuration and
    /// `history`.
    pub fn build_round(
        &self,
        round: usize,
        playing: &[PlayerId],
        history: &PairCounter,
    ) -> CpModel {
        self.build_round_vars(round, playing, history).0
    }

    fn build_round_vars(
        &self,
        round: usize,
        playing: &[PlayerId],
        history: &PairCounter,
    ) -> (CpModel, RoundVars) {
        let cap = self.config.co_occurrence_cap() as u32;
        let mut model = CpModel::new(format!("group[{round}]"));
        let vars = RoundVars::new(&mut model, round, playing.to_vec(), self.config.court_count);

        let mut penalties = Vec::new();
        for i in 0..playing.len() {
            for j in i + 1..playing.len() {
                let h = history.get(playing[i], playing[j]);
                if h == 0 {
                    continue;
                }
                if h >= cap {
                    for (a, b) in vars.shared(i, j) {
                        model.add_sum_le("co-occurrence-cap", &[a, b], 1);
                    }
                    continue;
                }
                let together = model.new_bool(format!("repeat[{}][{}]", playing[i], playing[j]));
                for (a, b) in vars.shared(i, j) {
                    model.add_linear(
                        "co-occurrence-link",
                        vec![(a, 1), (b, 1), (together, -1)],
                        i64::MIN / 4,
                        1,
                    );
                }
                let weight = self.config.repeat_weight * i64::from(h) * i64::from(h);
                if weight > 0 {
                    penalties.push((together, weight));
                }
            }
        }
        if !penalties.is_empty() {
            model.set_objective(Objective::Minimize(penalties));
        }
        (model, vars)
    }

    fn solve_rolling<S: CpSolver>(
        &self,
        solver: &S,
        schedule: &Schedule,
    ) -> Result<(Vec<Vec<Unit>>, StageOutcome), PlanError> {
        let started = Instant::now();
        let rounds = schedule.rounds.len();
        let mut history = PairCounter::new(self.config.player_count);
        let mut groups = Vec::with_capacity(rounds);
        let mut outcome: Option<StageOutcome> = None;

        for (r, round) in schedule.rounds.iter().enumerate() {
            let playing = round.playing(self.config.player_count);
            let (model, vars) = self.build_round_vars(r, &playing, &history);
            let budget = self.round_budget(started, rounds - r);
            let solution = solver.solve(&model, &budget);
            let round_outcome = accept(Stage::Group, Stage::Group, &solution)?;
            debug!(
                round = r,
                status = ?round_outcome.status,
                objective = ?round_outcome.objective,
                "round grouped"
            );

            let units = vars.decode(|v| solution.value(v), self.config.court_count);
            for unit in &units {
                history.add_group(&unit.players);
            }
            groups.push(units);
            match outcome.as_mut() {
                Some(total) => total.absorb(&round_outcome),
                None => outcome = Some(round_outcome),
            }
        }

        Ok((groups, outcome.unwrap_or_else(StageOutcome::trivial)))
    }

    /// Splits the stage budget evenly over the rounds still to solve.
    fn round_budget(&self, started: Instant, rounds_left: usize) -> SolverConfig {
        let mut budget = self.config.solver.clone();
        if let Some(total) = budget.time_limit_ms {
            let spent = started.elapsed().as_millis() as u64;
            let remaining = total.saturating_sub(spent);
            budget.time_limit_ms = Some((remaining / rounds_left.max(1) as u64).max(1));
        }
        budget.seed = budget.seed.wrapping_add(rounds_left as u64);
        budget
    }

    /// Builds the all-rounds model.
    pub fn build_joint(&self, schedule: &Schedule) -> CpModel {
        self.build_joint_vars(schedule).0
    }

    fn build_joint_vars(&self, schedule: &Schedule) -> (CpModel, Vec<RoundVars>) {
        let cap = self.config.co_occurrence_cap() as i64;
        let mut model = CpModel::new("group");
        let mut meetings: HashMap<(PlayerId, PlayerId), Vec<BoolVar>> = HashMap::new();

        let rounds: Vec<RoundVars> = schedule
            .rounds
            .iter()
            .enumerate()
            .map(|(r, round)| {
                let playing = round.playing(self.config.player_count);
                let vars = RoundVars::new(&mut model, r, playing, self.config.court_count);
                for i in 0..vars.playing.len() {
                    for j in i + 1..vars.playing.len() {
                        let (a, b) = (vars.playing[i], vars.playing[j]);
                        for (g, (xa, xb)) in vars.shared(i, j).enumerate() {
                            let met = model.new_bool(format!("met[{r}][{a}][{b}][{g}]"));
                            model.add_linear(
                                "co-occurrence-link",
                                vec![(xa, 1), (xb, 1), (met, -1)],
                                i64::MIN / 4,
                                1,
                            );
                            model.add_linear(
                                "co-occurrence-link",
                                vec![(met, 1), (xa, -1)],
                                i64::MIN / 4,
                                0,
                            );
                            model.add_linear(
                                "co-occurrence-link",
                                vec![(met, 1), (xb, -1)],
                                i64::MIN / 4,
                                0,
                            );
                            meetings.entry((a, b)).or_default().push(met);
                        }
                    }
                }
                vars
            })
            .collect();

        let mut pairs: Vec<_> = meetings.into_iter().collect();
        pairs.sort_unstable_by_key(|(pair, _)| *pair);
        let mut penalties = Vec::new();
        for ((a, b), met) in pairs {
            if met.len() as i64 > cap {
                model.add_sum_le("co-occurrence-cap", &met, cap);
            }
            let unmet = model.new_bool(format!("unmet[{a}][{b}]"));
            let mut terms: Vec<(BoolVar, i64)> = met.iter().map(|&v| (v, 1)).collect();
            terms.push((unmet, 1));
            model.add_linear("pair-coverage", terms, 1, i64::MAX / 4);
            if self.config.coverage_weight > 0 {
                penalties.push((unmet, self.config.coverage_weight));
            }
        }
        if !penalties.is_empty() {
            model.set_objective(Objective::Minimize(penalties));
        }
        (model, rounds)
    }

    fn solve_joint<S: CpSolver>(
        &self,
        solver: &S,
        schedule: &Schedule,
    ) -> Result<(Vec<Vec<Unit>>, StageOutcome), PlanError> {
        let (model, rounds) = self.build_joint_vars(schedule);
        debug!(
            vars = model.var_count(),
            constraints = model.constraint_count(),
            "joint group model built"
        );
        let solution = solver.solve(&model, &self.config.solver);
        let outcome = accept(Stage::Group, Stage::Group, &solution)?;
        let groups = rounds
            .iter()
            .map(|vars| vars.decode(|v| solution.value(v), self.config.court_count))
            .collect();
        Ok((groups, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::MilpSolver;
    use crate::models::StageOutcome;

    fn fast(config: RotationConfig) -> RotationConfig {
        config.with_solver(SolverConfig::default().with_time_limit_ms(20_000).with_seed(11))
    }

    fn benched(config: &RotationConfig, benches: Vec<Vec<PlayerId>>) -> Schedule {
        let mut schedule = Schedule::empty(config);
        schedule.set_bench(benches, StageOutcome::trivial());
        schedule
    }

    fn assert_partitions(schedule: &Schedule, groups: &[Vec<Unit>], courts: usize) {
        for (round, units) in schedule.rounds.iter().zip(groups) {
            assert_eq!(units.len(), courts);
            let mut all: Vec<PlayerId> = units.iter().flat_map(|u| u.players).collect();
            all.sort_unstable();
            assert_eq!(all, round.playing(schedule.player_count));
        }
    }

    #[test]
    fn test_single_round_partition() {
        let config = fast(RotationConfig::new(8, 2, 1));
        let schedule = benched(&config, vec![vec![]]);
        let (groups, outcome) = GroupPlanner::new(&config)
            .solve(&MilpSolver::new(), &schedule)
            .unwrap();
        assert_partitions(&schedule, &groups, 2);
        assert_eq!(outcome.objective, Some(0));
    }

    #[test]
    fn test_rolling_avoids_repeats() {
        // 8 players on 2 courts for 2 rounds: the second round can mix the
        // first round's units completely (each unit takes two from each).
        let config = fast(RotationConfig::new(8, 2, 2));
        let schedule = benched(&config, vec![vec![], vec![]]);
        let (groups, outcome) = GroupPlanner::new(&config)
            .solve(&MilpSolver::new(), &schedule)
            .unwrap();
        assert_partitions(&schedule, &groups, 2);

        // each unit of round 1 repeats exactly two pairs from round 0
        let mut history = PairCounter::new(8);
        for unit in &groups[0] {
            history.add_group(&unit.players);
        }
        let repeats: usize = groups[1]
            .iter()
            .map(|u| {
                let p = u.players;
                (0..4)
                    .flat_map(|i| (i + 1..4).map(move |j| (i, j)))
                    .filter(|&(i, j)| history.get(p[i], p[j]) > 0)
                    .count()
            })
            .sum();
        assert_eq!(repeats, 4);
        assert_eq!(outcome.objective, Some(4));
        assert!(!outcome.suboptimal);
    }

    #[test]
    fn test_cap_forbids_pair() {
        let config = RotationConfig::new(8, 2, 2).with_max_co_occurrence(1);
        let planner = GroupPlanner::new(&config);
        let mut history = PairCounter::new(8);
        history.increment(0, 1);
        history.increment(2, 3);
        let playing: Vec<PlayerId> = (0..8).collect();
        let model = planner.build_round(1, &playing, &history);
        // player 0 can only use unit 0; players 2 and 3 share both units
        let caps = model
            .constraints()
            .iter()
            .filter(|c| c.family == "co-occurrence-cap")
            .count();
        assert_eq!(caps, 3);

        let solution = MilpSolver::new().solve(&model, &config.solver);
        assert!(solution.is_solution_found());
    }

    #[test]
    fn test_cap_makes_round_infeasible() {
        // 4 players on one court with cap 1: the second round must repeat
        let config = fast(RotationConfig::new(4, 1, 2).with_max_co_occurrence(1));
        let schedule = benched(&config, vec![vec![], vec![]]);
        let err = GroupPlanner::new(&config)
            .solve(&MilpSolver::new(), &schedule)
            .unwrap_err();
        match err {
            PlanError::Infeasible {
                stage, implicated, ..
            } => {
                assert_eq!(stage, Stage::Group);
                assert_eq!(implicated, Stage::Group);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_joint_covers_pairs() {
        // 8 players, 2 courts, 3 rounds: every pair can meet
        let config = fast(
            RotationConfig::new(8, 2, 3).with_group_strategy(GroupStrategy::Joint),
        );
        let schedule = benched(&config, vec![vec![]; 3]);
        let (groups, _) = GroupPlanner::new(&config)
            .solve(&MilpSolver::new(), &schedule)
            .unwrap();
        assert_partitions(&schedule, &groups, 2);

        let mut history = PairCounter::new(8);
        for unit in groups.iter().flatten() {
            history.add_group(&unit.players);
        }
        assert!(history.max() <= config.co_occurrence_cap() as u32);
    }

    #[test]
    fn test_same_seed_same_groups() {
        let config = fast(RotationConfig::new(12, 2, 3));
        let schedule = benched(
            &config,
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9, 10, 11]],
        );
        let planner = GroupPlanner::new(&config);
        let (a, _) = planner.solve(&MilpSolver::new(), &schedule).unwrap();
        let (b, _) = planner.solve(&MilpSolver::new(), &schedule).unwrap();
        assert_eq!(a, b);
    }
}
