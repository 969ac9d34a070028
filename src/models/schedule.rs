//! Schedule (solution) model.
//!
//! A schedule is the single artifact handed between stages: per round the
//! bench, then the units of four, then each unit's court and team split.
//! Each stage replaces its own layer and clears the layers downstream of it,
//! so a persisted schedule is always a clean checkpoint: bench-only,
//! bench + groups, or complete.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::{RotationConfig, PLAYERS_PER_UNIT};
use crate::cp::{CpSolution, SolveStatus};

/// Player identity, `0..P`.
pub type PlayerId = usize;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Bench assignment.
    Bench,
    /// Grouping into units of four.
    Group,
    /// Team split and court assignment.
    Court,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Bench => "bench",
            Stage::Group => "group",
            Stage::Court => "court",
        })
    }
}

/// Two partners. The smaller id is always first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Team(pub PlayerId, pub PlayerId);

impl Team {
    /// Creates a normalised team.
    pub fn new(a: PlayerId, b: PlayerId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Whether `player` is on this team.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.0 == player || self.1 == player
    }

    /// The other member, if `player` is on this team.
    pub fn partner_of(&self, player: PlayerId) -> Option<PlayerId> {
        if self.0 == player {
            Some(self.1)
        } else if self.1 == player {
            Some(self.0)
        } else {
            None
        }
    }
}

/// Four players sharing a court in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Members, sorted ascending.
    pub players: [PlayerId; PLAYERS_PER_UNIT],
    /// Assigned court, once the court stage has run.
    pub court: Option<usize>,
    /// Team split, once the court stage has run.
    pub teams: Option<[Team; 2]>,
}

impl Unit {
    /// Creates a unit without court or teams.
    pub fn new(mut players: [PlayerId; PLAYERS_PER_UNIT]) -> Self {
        players.sort_unstable();
        Self {
            players,
            court: None,
            teams: None,
        }
    }

    /// Sets the court.
    pub fn with_court(mut self, court: usize) -> Self {
        self.court = Some(court);
        self
    }

    /// Sets the team split.
    pub fn with_teams(mut self, teams: [Team; 2]) -> Self {
        self.teams = Some(teams);
        self
    }

    /// Whether `player` is a member.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// The three possible 2–2 splits of the unit.
    ///
    /// With members `[a, b, c, d]`: `ab|cd`, `ac|bd`, `ad|bc`.
    pub fn splits(&self) -> [[Team; 2]; 3] {
        let [a, b, c, d] = self.players;
        [
            [Team::new(a, b), Team::new(c, d)],
            [Team::new(a, c), Team::new(b, d)],
            [Team::new(a, d), Team::new(b, c)],
        ]
    }

    /// The team `player` belongs to, if teams are set.
    pub fn team_of(&self, player: PlayerId) -> Option<Team> {
        self.teams?.into_iter().find(|t| t.contains(player))
    }

    /// Opponents of `player`, if teams are set.
    pub fn opponents_of(&self, player: PlayerId) -> Option<[PlayerId; 2]> {
        let teams = self.teams?;
        let other = teams.into_iter().find(|t| !t.contains(player))?;
        self.contains(player).then_some([other.0, other.1])
    }
}

/// One round: bench plus units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round index, `0..R`.
    pub index: usize,
    /// Benched players, sorted ascending.
    pub bench: Vec<PlayerId>,
    /// Units (empty until the group stage has run).
    pub units: Vec<Unit>,
}

impl Round {
    /// Creates a round with only its bench.
    pub fn new(index: usize, mut bench: Vec<PlayerId>) -> Self {
        bench.sort_unstable();
        Self {
            index,
            bench,
            units: Vec::new(),
        }
    }

    /// Whether `player` sits out this round.
    pub fn is_benched(&self, player: PlayerId) -> bool {
        self.bench.binary_search(&player).is_ok()
    }

    /// Players not on the bench, ascending.
    pub fn playing(&self, player_count: usize) -> Vec<PlayerId> {
        (0..player_count).filter(|&p| !self.is_benched(p)).collect()
    }

    /// The unit containing `player`.
    pub fn unit_of(&self, player: PlayerId) -> Option<&Unit> {
        self.units.iter().find(|u| u.contains(player))
    }

    /// The unit assigned to `court`.
    pub fn unit_on_court(&self, court: usize) -> Option<&Unit> {
        self.units.iter().find(|u| u.court == Some(court))
    }
}

/// Engine outcome recorded for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// `Optimal` or `Feasible`.
    pub status: SolveStatus,
    /// Set when the search budget expired before optimality was proven.
    pub suboptimal: bool,
    /// Objective value, if the stage optimizes one.
    pub objective: Option<i64>,
    /// Wall time spent (ms).
    pub elapsed_ms: u64,
}

impl StageOutcome {
    /// Outcome of a stage decided without calling the engine.
    pub fn trivial() -> Self {
        Self {
            status: SolveStatus::Optimal,
            suboptimal: false,
            objective: Some(0),
            elapsed_ms: 0,
        }
    }

    /// Outcome of a single engine call.
    pub fn from_solution(solution: &CpSolution) -> Self {
        Self {
            status: solution.status,
            suboptimal: solution.status == SolveStatus::Feasible,
            objective: solution.objective,
            elapsed_ms: solution.elapsed.as_millis() as u64,
        }
    }

    /// Folds another engine call of the same stage into this outcome.
    pub fn absorb(&mut self, other: &StageOutcome) {
        if other.suboptimal {
            self.status = SolveStatus::Feasible;
            self.suboptimal = true;
        }
        self.objective = match (self.objective, other.objective) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.elapsed_ms += other.elapsed_ms;
    }
}

/// Outcomes per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLog {
    /// Bench stage.
    pub bench: Option<StageOutcome>,
    /// Group stage.
    pub group: Option<StageOutcome>,
    /// Court stage.
    pub court: Option<StageOutcome>,
}

/// The persisted rotation schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Roster size `P`.
    pub player_count: usize,
    /// Courts per round `C`.
    pub court_count: usize,
    /// Rounds `R`.
    pub round_count: usize,
    /// Rounds in order (empty until the bench stage has run).
    pub rounds: Vec<Round>,
    /// Stage outcomes.
    #[serde(default)]
    pub stages: StageLog,
}

impl Schedule {
    /// Creates an empty schedule for a configuration.
    pub fn empty(config: &RotationConfig) -> Self {
        Self {
            player_count: config.player_count,
            court_count: config.court_count,
            round_count: config.round_count,
            rounds: Vec::new(),
            stages: StageLog::default(),
        }
    }

    /// Whether the dimensions match a configuration.
    pub fn matches(&self, config: &RotationConfig) -> bool {
        self.player_count == config.player_count
            && self.court_count == config.court_count
            && self.round_count == config.round_count
    }

    /// Whether every round has its bench.
    pub fn has_bench(&self) -> bool {
        self.stages.bench.is_some() && self.rounds.len() == self.round_count
    }

    /// Whether every round has its units.
    pub fn has_groups(&self) -> bool {
        self.has_bench()
            && self.stages.group.is_some()
            && self.rounds.iter().all(|r| r.units.len() == self.court_count)
    }

    /// Whether every unit has a court and a team split.
    pub fn has_courts(&self) -> bool {
        self.has_groups()
            && self.stages.court.is_some()
            && self
                .rounds
                .iter()
                .flat_map(|r| &r.units)
                .all(|u| u.court.is_some() && u.teams.is_some())
    }

    /// Latest stage whose layer is complete.
    pub fn completed_stage(&self) -> Option<Stage> {
        if self.has_courts() {
            Some(Stage::Court)
        } else if self.has_groups() {
            Some(Stage::Group)
        } else if self.has_bench() {
            Some(Stage::Bench)
        } else {
            None
        }
    }

    /// Whether any stage was accepted without an optimality proof.
    pub fn is_suboptimal(&self) -> bool {
        [&self.stages.bench, &self.stages.group, &self.stages.court]
            .into_iter()
            .flatten()
            .any(|o| o.suboptimal)
    }

    /// Replaces the bench layer; clears groups and courts.
    pub fn set_bench(&mut self, benches: Vec<Vec<PlayerId>>, outcome: StageOutcome) {
        self.rounds = benches
            .into_iter()
            .enumerate()
            .map(|(index, bench)| Round::new(index, bench))
            .collect();
        self.stages = StageLog {
            bench: Some(outcome),
            group: None,
            court: None,
        };
    }

    /// Replaces the group layer; clears courts.
    pub fn set_groups(&mut self, groups: Vec<Vec<Unit>>, outcome: StageOutcome) {
        for (round, units) in self.rounds.iter_mut().zip(groups) {
            round.units = units;
        }
        self.stages.group = Some(outcome);
        self.stages.court = None;
    }

    /// Replaces the court layer. Units of each round are stored in court order.
    pub fn set_courts(&mut self, units: Vec<Vec<Unit>>, outcome: StageOutcome) {
        for (round, mut units) in self.rounds.iter_mut().zip(units) {
            units.sort_by_key(|u| u.court);
            round.units = units;
        }
        self.stages.court = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        let config = RotationConfig::new(5, 1, 2);
        let mut s = Schedule::empty(&config);
        s.set_bench(vec![vec![4], vec![0]], StageOutcome::trivial());
        s
    }

    #[test]
    fn test_team_normalised() {
        let t = Team::new(7, 2);
        assert_eq!(t, Team(2, 7));
        assert_eq!(t.partner_of(7), Some(2));
        assert_eq!(t.partner_of(3), None);
    }

    #[test]
    fn test_unit_splits() {
        let unit = Unit::new([9, 3, 5, 1]);
        assert_eq!(unit.players, [1, 3, 5, 9]);
        let splits = unit.splits();
        assert_eq!(splits[0], [Team(1, 3), Team(5, 9)]);
        assert_eq!(splits[1], [Team(1, 5), Team(3, 9)]);
        assert_eq!(splits[2], [Team(1, 9), Team(3, 5)]);
    }

    #[test]
    fn test_unit_teams_and_opponents() {
        let unit = Unit::new([0, 1, 2, 3]).with_teams([Team(0, 2), Team(1, 3)]);
        assert_eq!(unit.team_of(2), Some(Team(0, 2)));
        assert_eq!(unit.opponents_of(0), Some([1, 3]));
        assert_eq!(unit.opponents_of(7), None);
        assert_eq!(Unit::new([0, 1, 2, 3]).team_of(0), None);
    }

    #[test]
    fn test_round_playing() {
        let round = Round::new(0, vec![3, 1]);
        assert_eq!(round.bench, vec![1, 3]);
        assert!(round.is_benched(3));
        assert_eq!(round.playing(5), vec![0, 2, 4]);
    }

    #[test]
    fn test_stage_progression() {
        let mut s = sample_schedule();
        assert_eq!(s.completed_stage(), Some(Stage::Bench));

        s.set_groups(
            vec![vec![Unit::new([0, 1, 2, 3])], vec![Unit::new([1, 2, 3, 4])]],
            StageOutcome::trivial(),
        );
        assert_eq!(s.completed_stage(), Some(Stage::Group));

        let courts: Vec<Vec<Unit>> = s
            .rounds
            .iter()
            .map(|r| {
                r.units
                    .iter()
                    .map(|u| u.clone().with_court(0).with_teams(u.splits()[0]))
                    .collect()
            })
            .collect();
        s.set_courts(courts, StageOutcome::trivial());
        assert_eq!(s.completed_stage(), Some(Stage::Court));
        assert_eq!(s.rounds[1].unit_on_court(0).map(|u| u.players), Some([1, 2, 3, 4]));

        // re-running the bench stage discards downstream layers
        s.set_bench(vec![vec![2], vec![3]], StageOutcome::trivial());
        assert_eq!(s.completed_stage(), Some(Stage::Bench));
        assert!(s.rounds.iter().all(|r| r.units.is_empty()));
        assert!(s.stages.group.is_none());
    }

    #[test]
    fn test_empty_schedule() {
        let s = Schedule::empty(&RotationConfig::new(8, 2, 3));
        assert_eq!(s.completed_stage(), None);
        assert!(s.matches(&RotationConfig::new(8, 2, 3)));
        assert!(!s.matches(&RotationConfig::new(8, 2, 4)));
        assert!(!s.is_suboptimal());
    }

    #[test]
    fn test_outcome_absorb() {
        let mut total = StageOutcome::trivial();
        let mut part = StageOutcome::trivial();
        part.status = SolveStatus::Feasible;
        part.suboptimal = true;
        part.objective = Some(3);
        part.elapsed_ms = 10;
        total.absorb(&part);
        assert!(total.suboptimal);
        assert_eq!(total.status, SolveStatus::Feasible);
        assert_eq!(total.objective, Some(3));
        assert_eq!(total.elapsed_ms, 10);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Bench.to_string(), "bench");
        assert_eq!(Stage::Court.to_string(), "court");
    }
}
