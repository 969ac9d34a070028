//! Rotation domain models.
//!
//! Provides the configuration, the persisted schedule and the derived
//! per-player and per-pair histories.
//!
//! # Domain Mappings
//!
//! | u-rotation | Tennis doubles | Padel | Badminton doubles |
//! |------------|----------------|-------|-------------------|
//! | Unit | Court foursome | Court foursome | Court foursome |
//! | Team | Doubles pair | Pair | Pair |
//! | Bench | Sitting out | Waiting | Sitting out |
//! | Round | Set / time slot | Game slot | Game slot |

mod config;
mod pair;
mod player;
mod schedule;

pub use config::{BenchBounds, GroupStrategy, RotationConfig, PLAYERS_PER_UNIT};
pub use pair::PairCounter;
pub use player::PlayerStats;
pub use schedule::{PlayerId, Round, Schedule, Stage, StageLog, StageOutcome, Team, Unit};
