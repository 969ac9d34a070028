//! Rotation configuration and derived bounds.
//!
//! Bench bounds and the rebench cooldown are derived from the roster size
//! `P`, the court count `C` and the round count `R` unless set explicitly.
//!
//! | Quantity | Derivation |
//! |----------|-----------|
//! | bench size `B` | `P - 4C` |
//! | mean bench turns `m` | `R·B / P` |
//! | bench bounds | `[floor(m), ceil(m)]` (rounds played differ by at most one) |
//! | cooldown | `ceil(P / B) - 2`, clamped to `R - 1` (`0` without a bench) |
//! | co-occurrence cap | `ceil(maxPlayed · 3 / (P - 1)) + 1`, clamped to `[1, R]` |

use serde::{Deserialize, Serialize};

use crate::cp::SolverConfig;

/// Players on one court.
pub const PLAYERS_PER_UNIT: usize = 4;

/// How the group stage is formulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupStrategy {
    /// One model per round, fed by the co-occurrence history so far.
    #[default]
    Rolling,
    /// One model over all rounds with cross-round caps.
    Joint,
}

/// Inclusive bench-count bounds per player.
///
/// The bench total `R·B` is fixed, so a band of width one around the mean
/// is the only one that keeps rounds played within one of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchBounds {
    /// `floor(m)`.
    pub min: usize,
    /// `ceil(m)`.
    pub max: usize,
}

/// Rotation problem configuration.
///
/// # Example
/// ```
/// use u_rotation::models::RotationConfig;
///
/// let config = RotationConfig::new(18, 3, 12);
/// assert_eq!(config.bench_size(), 6);
/// let bounds = config.bench_bounds();
/// assert_eq!((bounds.min, bounds.max), (4, 4));
/// assert_eq!(config.cooldown(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Roster size `P`.
    pub player_count: usize,
    /// Courts per round `C`.
    pub court_count: usize,
    /// Rounds `R`.
    pub round_count: usize,
    /// Rounds a player must play after a bench turn before the next one.
    pub min_games_before_rebench: Option<usize>,
    /// Maximum number of rounds any pair may share a unit.
    pub max_co_occurrence: Option<usize>,
    /// Group-stage formulation.
    pub group_strategy: GroupStrategy,
    /// Weight of a repeated unit-mate pairing (rolling group objective).
    pub repeat_weight: i64,
    /// Weight of a pair that never shares a unit (joint group objective).
    pub coverage_weight: i64,
    /// Weight of a pair sitting out together again (bench objective).
    pub bench_pair_weight: i64,
    /// Keep the teams already present in the input of the court stage.
    pub keep_teams: bool,
    /// Engine budget and seed, applied per stage.
    pub solver: SolverConfig,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self::new(12, 3, 6)
    }
}

impl RotationConfig {
    /// Creates a configuration with derived bounds.
    pub fn new(player_count: usize, court_count: usize, round_count: usize) -> Self {
        Self {
            player_count,
            court_count,
            round_count,
            min_games_before_rebench: None,
            max_co_occurrence: None,
            group_strategy: GroupStrategy::Rolling,
            repeat_weight: 1,
            coverage_weight: 1,
            bench_pair_weight: 1,
            keep_teams: false,
            solver: SolverConfig::default(),
        }
    }

    /// Sets the rebench cooldown explicitly.
    pub fn with_cooldown(mut self, rounds: usize) -> Self {
        self.min_games_before_rebench = Some(rounds);
        self
    }

    /// Sets the co-occurrence cap explicitly.
    pub fn with_max_co_occurrence(mut self, cap: usize) -> Self {
        self.max_co_occurrence = Some(cap);
        self
    }

    /// Sets the group-stage formulation.
    pub fn with_group_strategy(mut self, strategy: GroupStrategy) -> Self {
        self.group_strategy = strategy;
        self
    }

    /// Sets the repeated-pairing weight.
    pub fn with_repeat_weight(mut self, weight: i64) -> Self {
        self.repeat_weight = weight;
        self
    }

    /// Sets the never-met pair weight.
    pub fn with_coverage_weight(mut self, weight: i64) -> Self {
        self.coverage_weight = weight;
        self
    }

    /// Sets the shared-bench weight.
    pub fn with_bench_pair_weight(mut self, weight: i64) -> Self {
        self.bench_pair_weight = weight;
        self
    }

    /// Keeps existing teams when the court stage runs again.
    pub fn with_keep_teams(mut self, keep: bool) -> Self {
        self.keep_teams = keep;
        self
    }

    /// Sets the engine configuration.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Players seated on the bench each round (`P - 4C`).
    pub fn bench_size(&self) -> usize {
        self.player_count
            .saturating_sub(self.court_count * PLAYERS_PER_UNIT)
    }

    /// Players on court each round (`4C`).
    pub fn playing_slots(&self) -> usize {
        self.court_count * PLAYERS_PER_UNIT
    }

    /// Per-player bench-count bounds.
    pub fn bench_bounds(&self) -> BenchBounds {
        if self.player_count == 0 {
            return BenchBounds { min: 0, max: 0 };
        }
        let total = self.round_count * self.bench_size();
        BenchBounds {
            min: total / self.player_count,
            max: total.div_ceil(self.player_count),
        }
    }

    /// Effective rebench cooldown.
    pub fn cooldown(&self) -> usize {
        if let Some(rounds) = self.min_games_before_rebench {
            return rounds;
        }
        let bench = self.bench_size();
        if bench == 0 {
            return 0;
        }
        self.player_count
            .div_ceil(bench)
            .saturating_sub(2)
            .min(self.round_count.saturating_sub(1))
    }

    /// Effective co-occurrence cap.
    pub fn co_occurrence_cap(&self) -> usize {
        if let Some(cap) = self.max_co_occurrence {
            return cap;
        }
        let ceiling = self.round_count.max(1);
        if self.player_count < 2 {
            return ceiling;
        }
        let max_played = self.round_count - self.bench_bounds().min.min(self.round_count);
        let mates = (max_played * (PLAYERS_PER_UNIT - 1)).div_ceil(self.player_count - 1);
        (mates + 1).clamp(1, ceiling)
    }

    /// Most bench turns a player can take under the cooldown.
    pub fn bench_capacity(&self) -> usize {
        self.round_count.div_ceil(self.cooldown() + 1)
    }
}
