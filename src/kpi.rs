//! Rotation quality metrics (KPIs).
//!
//! Computes fairness and variety indicators from a (possibly partial)
//! schedule. Layers that are not planned yet contribute zeros.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Bench spread | max − min bench turns per player |
//! | Played spread | max − min rounds played per player |
//! | Distinct unit-mates | players shared a unit with at least once (min / mean) |
//! | Pairs never met | pairs that never shared a unit |
//! | Max co-occurrence | most rounds any pair shared a unit |
//! | Repeated partners | pairs that were teammates more than once |
//! | Repeated bench pairs | pairs that sat out together more than once |
//! | Back-to-back repeats | pairs sharing a unit in two consecutive rounds |
//! | Court spread | per player max − min rounds on a court |
//!
//! # Reference
//! Lewis (2016), "A Guide to Graph Colouring", Ch. 9.3 (social golfer evaluation)

use crate::models::{PairCounter, PlayerStats, Schedule};

/// Rotation performance indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationKpi {
    /// max − min bench turns.
    pub bench_spread: usize,
    /// max − min rounds played.
    pub played_spread: usize,
    /// Fewest distinct unit-mates of any player.
    pub min_distinct_mates: usize,
    /// Mean distinct unit-mates per player.
    pub avg_distinct_mates: f64,
    /// Pairs that never shared a unit.
    pub pairs_never_met: usize,
    /// Most rounds any pair shared a unit.
    pub max_co_occurrence: u32,
    /// Pairs partnered more than once.
    pub repeated_partner_pairs: usize,
    /// Pairs benched together more than once.
    pub repeated_bench_pairs: usize,
    /// Pair occurrences repeated from the previous round's unit.
    pub back_to_back_repeats: usize,
    /// Largest per-player court spread.
    pub max_court_spread: usize,
    /// Players whose court spread equals the largest.
    pub players_at_max_court_spread: usize,
}

impl RotationKpi {
    /// Computes KPIs from a schedule.
    pub fn calculate(schedule: &Schedule) -> Self {
        let stats = PlayerStats::collect(schedule);
        let spread = |values: Vec<usize>| {
            let max = values.iter().copied().max().unwrap_or(0);
            let min = values.iter().copied().min().unwrap_or(0);
            max - min
        };
        let bench_spread = spread(stats.iter().map(|s| s.bench_count).collect());
        let played_spread = spread(stats.iter().map(|s| s.total_rounds_played).collect());

        let co_occurrence = PairCounter::co_occurrence(schedule);
        let mates: Vec<usize> = (0..schedule.player_count)
            .map(|p| co_occurrence.distinct_for(p))
            .collect();
        let min_distinct_mates = mates.iter().copied().min().unwrap_or(0);
        let avg_distinct_mates = if mates.is_empty() {
            0.0
        } else {
            mates.iter().sum::<usize>() as f64 / mates.len() as f64
        };
        let pairs_never_met = co_occurrence.pairs().filter(|&(_, _, c)| c == 0).count();

        let mut back_to_back_repeats = 0;
        for pair in schedule.rounds.windows(2) {
            let mut previous = PairCounter::new(schedule.player_count);
            for unit in &pair[0].units {
                previous.add_group(&unit.players);
            }
            for unit in &pair[1].units {
                let p = unit.players;
                for i in 0..p.len() {
                    back_to_back_repeats += p[i + 1..]
                        .iter()
                        .filter(|&&q| previous.get(p[i], q) > 0)
                        .count();
                }
            }
        }

        let court_spreads: Vec<usize> = if schedule.has_courts() {
            stats
                .iter()
                .map(|s| s.court_spread(schedule.court_count))
                .collect()
        } else {
            Vec::new()
        };
        let max_court_spread = court_spreads.iter().copied().max().unwrap_or(0);
        let players_at_max_court_spread = court_spreads
            .iter()
            .filter(|&&s| s == max_court_spread)
            .count();

        Self {
            bench_spread,
            played_spread,
            min_distinct_mates,
            avg_distinct_mates,
            pairs_never_met,
            max_co_occurrence: co_occurrence.max(),
            repeated_partner_pairs: PairCounter::partners(schedule).count_at_least(2),
            repeated_bench_pairs: PairCounter::shared_bench(schedule).count_at_least(2),
            back_to_back_repeats,
            max_court_spread,
            players_at_max_court_spread,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_co_occurrence: u32, max_court_spread: usize) -> bool {
        self.repeated_partner_pairs == 0
            && self.max_co_occurrence <= max_co_occurrence
            && self.max_court_spread <= max_court_spread
    }
}
