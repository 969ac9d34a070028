//! Bench stage: who sits out each round.
//!
//! # Formulation
//!
//! Variables `bench[r][p]`, one per round and player.
//! - `bench-size`: `Σ_p bench[r][p] = B` for every round
//! - `bench-frequency`: `floor(m) <= Σ_r bench[r][p] <= ceil(m)` for every
//!   player, so rounds played differ by at most one
//! - `rebench-cooldown`: `Σ_{t=r..=r+d} bench[t][p] <= 1`, so two bench
//!   turns of a player are at least `d + 1` rounds apart
//!
//! # Objective
//!
//! Pairs that sit out together more than once. `both[r][a][b]` is forced on
//! when `a` and `b` share the bench of round `r` (`bench-pair-link`). Each
//! pair has ordered surplus indicators whose k-th costs `w·k`, and
//! `bench-pair-repeat` bounds the shared rounds by `1 + Σ surplus`. A pair
//! sharing `n` rounds costs `w·n(n-1)/2`.
//!
//! # Reference
//! Ernst et al. (2004), "Staff scheduling and rostering: A review of
//! applications, methods and models", §3.3 (days-off scheduling)

use tracing::debug;

use super::{accept, log_stage};
use crate::cp::{BoolVar, CpModel, CpSolver, Objective};
use crate::error::PlanError;
use crate::models::{PlayerId, RotationConfig, Stage, StageOutcome};

/// Builds and solves the bench model.
///
/// # Example
/// ```
/// use u_rotation::cp::MilpSolver;
/// use u_rotation::models::RotationConfig;
/// use u_rotation::planner::BenchPlanner;
///
/// let config = RotationConfig::new(6, 1, 3);
/// let (benches, _) = BenchPlanner::new(&config).solve(&MilpSolver::new()).unwrap();
/// assert!(benches.iter().all(|b| b.len() == 2));
/// ```
pub struct BenchPlanner<'a> {
    config: &'a RotationConfig,
}

/// A built bench model and its variable layout.
pub struct BenchModel {
    /// The engine model.
    pub model: CpModel,
    benched: Vec<Vec<BoolVar>>,
}

impl<'a> BenchPlanner<'a> {
    /// Creates a bench planner.
    pub fn new(config: &'a RotationConfig) -> Self {
        Self { config }
    }

    /// Builds the bench model.
    pub fn build(&self) -> BenchModel {
        let p = self.config.player_count;
        let r = self.config.round_count;
        let bounds = self.config.bench_bounds();
        let d = self.config.cooldown();
        let mut model = CpModel::new("bench");

        let benched: Vec<Vec<BoolVar>> = (0..r)
            .map(|round| {
                (0..p)
                    .map(|player| model.new_bool(format!("bench[{round}][{player}]")))
                    .collect()
            })
            .collect();

        for row in &benched {
            model.add_sum_eq("bench-size", row, self.config.bench_size() as i64);
        }

        for player in 0..p {
            let column: Vec<BoolVar> = benched.iter().map(|row| row[player]).collect();
            model.add_sum_between(
                "bench-frequency",
                &column,
                bounds.min as i64,
                bounds.max as i64,
            );

            if d > 0 {
                for start in 0..r.saturating_sub(d) {
                    model.add_sum_le("rebench-cooldown", &column[start..=start + d], 1);
                }
            }
        }

        let weight = self.config.bench_pair_weight;
        if weight > 0 && self.config.bench_size() >= 2 && bounds.max >= 2 {
            let penalties = shared_bench_terms(&mut model, &benched, bounds.max, weight);
            model.set_objective(Objective::Minimize(penalties));
        }

        BenchModel { model, benched }
    }

    /// Solves the bench stage.
    ///
    /// # Returns
    /// The sorted bench of every round and the engine outcome.
    pub fn solve<S: CpSolver>(
        &self,
        solver: &S,
    ) -> Result<(Vec<Vec<PlayerId>>, StageOutcome), PlanError> {
        let rounds = self.config.round_count;
        if self.config.bench_size() == 0 {
            debug!(rounds, "no bench seats; skipping engine");
            let outcome = StageOutcome::trivial();
            log_stage(Stage::Bench, &outcome);
            return Ok((vec![Vec::new(); rounds], outcome));
        }

        let built = self.build();
        debug!(
            vars = built.model.var_count(),
            constraints = built.model.constraint_count(),
            "bench model built"
        );
        let solution = solver.solve(&built.model, &self.config.solver);
        let outcome = accept(Stage::Bench, Stage::Bench, &solution)?;
        log_stage(Stage::Bench, &outcome);

        let benches = built
            .benched
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &v)| solution.value(v))
                    .map(|(player, _)| player)
                    .collect()
            })
            .collect();
        Ok((benches, outcome))
    }
}

/// Adds the shared-bench indicators and returns their weighted cost terms.
fn shared_bench_terms(
    model: &mut CpModel,
    benched: &[Vec<BoolVar>],
    max_turns: usize,
    weight: i64,
) -> Vec<(BoolVar, i64)> {
    let players = benched.first().map_or(0, Vec::len);
    let mut penalties = Vec::new();
    for a in 0..players {
        for b in a + 1..players {
            let both: Vec<BoolVar> = benched
                .iter()
                .enumerate()
                .map(|(round, row)| {
                    let y = model.new_bool(format!("both[{round}][{a}][{b}]"));
                    model.add_linear("bench-pair-link", vec![(row[a], 1), (row[b], 1), (y, -1)], i64::MIN / 4, 1);
                    y
                })
                .collect();

            // increasing weights make the engine use surplus[k] before surplus[k + 1]
            let surplus: Vec<BoolVar> = (1..max_turns)
                .map(|k| model.new_bool(format!("surplus[{a}][{b}][{k}]")))
                .collect();
            let mut terms: Vec<(BoolVar, i64)> = both.iter().map(|&v| (v, 1)).collect();
            terms.extend(surplus.iter().map(|&v| (v, -1)));
            model.add_linear("bench-pair-repeat", terms, i64::MIN / 4, 1);
            penalties.extend(
                surplus
                    .iter()
                    .enumerate()
                    .map(|(k, &v)| (v, weight * (k as i64 + 1))),
            );
        }
    }
    penalties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{MilpSolver, SolveStatus, SolverConfig};
    use crate::models::PairCounter;

    fn solve(config: &RotationConfig) -> Result<(Vec<Vec<PlayerId>>, StageOutcome), PlanError> {
        BenchPlanner::new(config).solve(&MilpSolver::new())
    }

    fn counts(benches: &[Vec<PlayerId>], players: usize) -> Vec<usize> {
        let mut counts = vec![0; players];
        for &p in benches.iter().flatten() {
            counts[p] += 1;
        }
        counts
    }

    fn fast(config: RotationConfig) -> RotationConfig {
        config.with_solver(SolverConfig::default().with_time_limit_ms(20_000).with_seed(3))
    }

    fn shared_pairs(benches: &[Vec<PlayerId>], players: usize) -> PairCounter {
        let mut shared = PairCounter::new(players);
        for bench in benches {
            shared.add_group(bench);
        }
        shared
    }

    #[test]
    fn test_no_bench_skips_engine() {
        let config = RotationConfig::new(8, 2, 4);
        let (benches, outcome) = solve(&config).unwrap();
        assert_eq!(benches, vec![Vec::<PlayerId>::new(); 4]);
        assert_eq!(outcome.objective, Some(0));
        assert_eq!(outcome.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_exact_mean_bounds() {
        // 18 players, 3 courts, 12 rounds: 6 benched per round, 4 turns each
        let config = fast(RotationConfig::new(18, 3, 12).with_bench_pair_weight(0));
        let (benches, outcome) = solve(&config).unwrap();
        assert_eq!(benches.len(), 12);
        assert!(benches.iter().all(|b| b.len() == 6));
        assert!(counts(&benches, 18).iter().all(|&c| c == 4));
        assert!(!outcome.suboptimal);

        // cooldown 1: never benched in consecutive rounds
        for pair in benches.windows(2) {
            assert!(pair[0].iter().all(|p| !pair[1].contains(p)));
        }
    }

    #[test]
    fn test_uneven_mean() {
        // 9 players, 2 courts, 5 rounds: 5 bench slots over 9 players
        let config = fast(RotationConfig::new(9, 2, 5));
        let (benches, _) = solve(&config).unwrap();
        let c = counts(&benches, 9);
        assert_eq!(c.iter().sum::<usize>(), 5);
        assert!(c.iter().all(|&x| x <= 1));
    }

    #[test]
    fn test_played_spread_at_most_one() {
        // 10 players, 2 courts, 5 rounds: m = 1, every player benched once
        let config = fast(RotationConfig::new(10, 2, 5).with_cooldown(0));
        let (benches, _) = solve(&config).unwrap();
        assert!(counts(&benches, 10).iter().all(|&c| c == 1));

        // 7 players, 1 court, 5 rounds: m = 15/7, bench counts in [2, 3]
        let config = fast(RotationConfig::new(7, 1, 5).with_cooldown(0));
        let (benches, _) = solve(&config).unwrap();
        let c = counts(&benches, 7);
        assert!(c.iter().max().unwrap() - c.iter().min().unwrap() <= 1);
    }

    #[test]
    fn test_shared_bench_pairs_spread() {
        // 6 players, 1 court, 6 rounds: 2 benched per round, 2 turns each.
        // Six distinct bench pairs fit, so no pair needs to sit out twice.
        let config = fast(RotationConfig::new(6, 1, 6));
        let (benches, outcome) = solve(&config).unwrap();
        assert_eq!(outcome.objective, Some(0));
        assert_eq!(shared_pairs(&benches, 6).count_at_least(2), 0);
    }

    #[test]
    fn test_repeated_bench_pairs_cost() {
        let config = fast(RotationConfig::new(6, 1, 6));
        let mut built = BenchPlanner::new(&config).build();
        let rows = [[0, 1], [2, 3], [0, 1], [4, 5], [2, 3], [4, 5]];
        for (round, row) in rows.iter().enumerate() {
            for player in 0..6 {
                let var = built.benched[round][player];
                built.model.fix("pin", var, row.contains(&player));
            }
        }
        let solution = MilpSolver::new().solve(&built.model, &config.solver);
        assert_eq!(solution.status, SolveStatus::Optimal);
        // three pairs sit out together twice
        assert_eq!(solution.objective, Some(3));
    }

    #[test]
    fn test_zero_weight_has_no_objective() {
        let config = RotationConfig::new(6, 1, 6).with_bench_pair_weight(0);
        let built = BenchPlanner::new(&config).build();
        assert_eq!(built.model.var_count(), 36);
        assert!(!built.model.families().iter().any(|f| f.starts_with("bench-pair")));
    }

    #[test]
    fn test_model_shape() {
        let config = RotationConfig::new(6, 1, 4)
            .with_cooldown(1)
            .with_bench_pair_weight(0);
        let built = BenchPlanner::new(&config).build();
        // 4 rows + 6 columns + 6 players × 3 windows
        assert_eq!(built.model.var_count(), 24);
        assert_eq!(built.model.constraint_count(), 4 + 6 + 18);
    }

    #[test]
    fn test_same_seed_same_bench() {
        let config = fast(RotationConfig::new(10, 2, 6));
        let (a, _) = solve(&config).unwrap();
        let (b, _) = solve(&config).unwrap();
        assert_eq!(a, b);
    }
}
