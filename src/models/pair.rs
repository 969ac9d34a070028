//! Symmetric per-pair counters.
//!
//! Used for the co-occurrence history carried between rounds by the group
//! stage, for the partner history of the court stage, and for statistics.

use super::schedule::{PlayerId, Schedule};

/// Counter over unordered player pairs, stored as a strict upper triangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCounter {
    players: usize,
    counts: Vec<u32>,
}

impl PairCounter {
    /// Creates a zeroed counter for `players` players.
    pub fn new(players: usize) -> Self {
        Self {
            players,
            counts: vec![0; players * players.saturating_sub(1) / 2],
        }
    }

    /// Roster size.
    pub fn players(&self) -> usize {
        self.players
    }

    fn index(&self, a: PlayerId, b: PlayerId) -> usize {
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        // rows 0..i hold (players-1) + (players-2) + ... entries
        i * (2 * self.players - i - 1) / 2 + (j - i - 1)
    }

    fn in_range(&self, a: PlayerId, b: PlayerId) -> bool {
        a != b && a < self.players && b < self.players
    }

    /// Count for the pair `(a, b)`. Zero when `a == b` or either id is
    /// outside the roster.
    pub fn get(&self, a: PlayerId, b: PlayerId) -> u32 {
        if !self.in_range(a, b) {
            return 0;
        }
        self.counts[self.index(a, b)]
    }

    /// Increments the pair `(a, b)`. Ids outside the roster are ignored.
    pub fn increment(&mut self, a: PlayerId, b: PlayerId) {
        if self.in_range(a, b) {
            let i = self.index(a, b);
            self.counts[i] += 1;
        }
    }

    /// Increments every pair inside `group`.
    pub fn add_group(&mut self, group: &[PlayerId]) {
        for (k, &a) in group.iter().enumerate() {
            for &b in &group[k + 1..] {
                self.increment(a, b);
            }
        }
    }

    /// All pairs `(a, b, count)` with `a < b`.
    pub fn pairs(&self) -> impl Iterator<Item = (PlayerId, PlayerId, u32)> + '_ {
        (0..self.players).flat_map(move |a| {
            (a + 1..self.players).map(move |b| (a, b, self.get(a, b)))
        })
    }

    /// Largest count.
    pub fn max(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Number of pairs whose count is at least `k`.
    pub fn count_at_least(&self, k: u32) -> usize {
        self.counts.iter().filter(|&&c| c >= k).count()
    }

    /// Number of distinct players `player` has a non-zero count with.
    pub fn distinct_for(&self, player: PlayerId) -> usize {
        (0..self.players)
            .filter(|&q| q != player && self.get(player, q) > 0)
            .count()
    }

    /// Rounds in which each pair shared a unit.
    pub fn co_occurrence(schedule: &Schedule) -> Self {
        let mut counter = Self::new(schedule.player_count);
        for unit in schedule.rounds.iter().flat_map(|r| &r.units) {
            counter.add_group(&unit.players);
        }
        counter
    }

    /// Rounds in which each pair played on the same team.
    pub fn partners(schedule: &Schedule) -> Self {
        let mut counter = Self::new(schedule.player_count);
        for teams in schedule.rounds.iter().flat_map(|r| &r.units).filter_map(|u| u.teams) {
            for team in teams {
                counter.increment(team.0, team.1);
            }
        }
        counter
    }

    /// Rounds in which each pair sat on the bench together.
    pub fn shared_bench(schedule: &Schedule) -> Self {
        let mut counter = Self::new(schedule.player_count);
        for round in &schedule.rounds {
            counter.add_group(&round.bench);
        }
        counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RotationConfig, StageOutcome, Team, Unit};

    #[test]
    fn test_index_covers_triangle() {
        let mut counter = PairCounter::new(6);
        for a in 0..6 {
            for b in (a + 1)..6 {
                counter.increment(b, a);
            }
        }
        assert_eq!(counter.count_at_least(1), 15);
        assert_eq!(counter.max(), 1);
        assert_eq!(counter.get(3, 3), 0);
    }

    #[test]
    fn test_add_group() {
        let mut counter = PairCounter::new(8);
        counter.add_group(&[0, 1, 2, 3]);
        counter.add_group(&[0, 1, 4, 5]);
        assert_eq!(counter.get(1, 0), 2);
        assert_eq!(counter.get(2, 3), 1);
        assert_eq!(counter.get(2, 4), 0);
        assert_eq!(counter.distinct_for(0), 5);
        assert_eq!(counter.pairs().filter(|(_, _, c)| *c == 2).count(), 1);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut counter = PairCounter::new(5);
        counter.add_group(&[0, 1, 2, 9]);
        assert_eq!(counter.get(0, 9), 0);
        assert_eq!(counter.get(9, 0), 0);
        assert_eq!(counter.count_at_least(1), 3);
    }

    #[test]
    fn test_from_schedule() {
        let mut s = Schedule::empty(&RotationConfig::new(6, 1, 2));
        s.set_bench(vec![vec![4, 5], vec![4, 5]], StageOutcome::trivial());
        s.set_groups(
            vec![vec![Unit::new([0, 1, 2, 3])], vec![Unit::new([0, 1, 2, 3])]],
            StageOutcome::trivial(),
        );
        let units = vec![
            vec![Unit::new([0, 1, 2, 3]).with_court(0).with_teams([Team(0, 1), Team(2, 3)])],
            vec![Unit::new([0, 1, 2, 3]).with_court(0).with_teams([Team(0, 2), Team(1, 3)])],
        ];
        s.set_courts(units, StageOutcome::trivial());

        assert_eq!(PairCounter::co_occurrence(&s).get(0, 1), 2);
        assert_eq!(PairCounter::partners(&s).get(0, 1), 1);
        assert_eq!(PairCounter::partners(&s).get(0, 3), 0);
        assert_eq!(PairCounter::shared_bench(&s).get(4, 5), 2);
    }
}
