//! Per-player history derived from a schedule.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::schedule::{PlayerId, Schedule};

/// History of one player, recomputed by scanning a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Player identity.
    pub player: PlayerId,
    /// Rounds spent on the bench.
    pub bench_count: usize,
    /// Last round spent on the bench.
    pub last_bench_round: Option<usize>,
    /// Rounds played since the last bench turn (trailing streak).
    pub consecutive_played_rounds: usize,
    /// Players partnered at least once.
    pub partners_played: BTreeSet<PlayerId>,
    /// Opponent → rounds faced.
    pub opponents_played: BTreeMap<PlayerId, usize>,
    /// Court → rounds played on it.
    pub court_usage: BTreeMap<usize, usize>,
    /// Rounds on court.
    pub total_rounds_played: usize,
}

impl PlayerStats {
    /// Collects the history of every player of `schedule`.
    pub fn collect(schedule: &Schedule) -> Vec<PlayerStats> {
        let mut stats: Vec<PlayerStats> = (0..schedule.player_count)
            .map(|player| PlayerStats {
                player,
                ..Default::default()
            })
            .collect();

        for round in &schedule.rounds {
            for (player, s) in stats.iter_mut().enumerate() {
                if round.is_benched(player) {
                    s.bench_count += 1;
                    s.last_bench_round = Some(round.index);
                    s.consecutive_played_rounds = 0;
                } else {
                    s.total_rounds_played += 1;
                    s.consecutive_played_rounds += 1;
                }
            }

            for unit in &round.units {
                for &player in &unit.players {
                    let Some(s) = stats.get_mut(player) else {
                        continue;
                    };
                    if let Some(court) = unit.court {
                        *s.court_usage.entry(court).or_insert(0) += 1;
                    }
                    if let Some(partner) = unit.team_of(player).and_then(|t| t.partner_of(player)) {
                        s.partners_played.insert(partner);
                    }
                    for opponent in unit.opponents_of(player).into_iter().flatten() {
                        *s.opponents_played.entry(opponent).or_insert(0) += 1;
                    }
                }
            }
        }

        stats
    }

    /// Max − min rounds over `courts` courts (unused courts count as zero).
    pub fn court_spread(&self, courts: usize) -> usize {
        let usage = |c: usize| self.court_usage.get(&c).copied().unwrap_or(0);
        let max = (0..courts).map(usage).max().unwrap_or(0);
        let min = (0..courts).map(usage).min().unwrap_or(0);
        max - min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RotationConfig, StageOutcome, Team, Unit};

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::empty(&RotationConfig::new(5, 1, 3));
        s.set_bench(vec![vec![4], vec![0], vec![4]], StageOutcome::trivial());
        s.set_groups(
            vec![
                vec![Unit::new([0, 1, 2, 3])],
                vec![Unit::new([1, 2, 3, 4])],
                vec![Unit::new([0, 1, 2, 3])],
            ],
            StageOutcome::trivial(),
        );
        let units = vec![
            vec![Unit::new([0, 1, 2, 3]).with_court(0).with_teams([Team(0, 1), Team(2, 3)])],
            vec![Unit::new([1, 2, 3, 4]).with_court(0).with_teams([Team(1, 4), Team(2, 3)])],
            vec![Unit::new([0, 1, 2, 3]).with_court(0).with_teams([Team(0, 2), Team(1, 3)])],
        ];
        s.set_courts(units, StageOutcome::trivial());
        s
    }

    #[test]
    fn test_bench_history() {
        let stats = PlayerStats::collect(&sample_schedule());
        assert_eq!(stats[4].bench_count, 2);
        assert_eq!(stats[4].last_bench_round, Some(2));
        assert_eq!(stats[4].consecutive_played_rounds, 0);
        assert_eq!(stats[0].bench_count, 1);
        assert_eq!(stats[0].consecutive_played_rounds, 1);
        assert_eq!(stats[1].consecutive_played_rounds, 3);
        assert_eq!(stats[1].total_rounds_played, 3);
    }

    #[test]
    fn test_partner_and_opponent_history() {
        let stats = PlayerStats::collect(&sample_schedule());
        let p1 = &stats[1];
        assert_eq!(p1.partners_played, BTreeSet::from([0, 3, 4]));
        assert_eq!(p1.opponents_played.get(&2), Some(&3));
        assert_eq!(p1.opponents_played.get(&3), Some(&2));
        assert_eq!(p1.court_usage.get(&0), Some(&3));
    }

    #[test]
    fn test_court_spread() {
        let stats = PlayerStats::collect(&sample_schedule());
        assert_eq!(stats[1].court_spread(1), 0);
        assert_eq!(stats[1].court_spread(2), 3);
    }

    #[test]
    fn test_collect_skips_unknown_players() {
        let mut s = Schedule::empty(&RotationConfig::new(5, 1, 1));
        s.set_bench(vec![vec![3]], StageOutcome::trivial());
        s.set_groups(vec![vec![Unit::new([0, 1, 2, 9])]], StageOutcome::trivial());
        let stats = PlayerStats::collect(&s);
        assert_eq!(stats.len(), 5);
        assert_eq!(stats[0].total_rounds_played, 1);
        assert!(stats[0].opponents_played.is_empty());
    }
}
