//! State file persistence.
//!
//! The schedule is the only state carried between stages. It is stored as
//! pretty-printed JSON and written through a temporary sibling file that is
//! renamed over the target, so a crash never leaves a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PlanError;
use crate::models::Schedule;

/// Writes `schedule` to `path`, replacing any previous file.
pub fn save_schedule(path: impl AsRef<Path>, schedule: &Schedule) -> Result<(), PlanError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(schedule)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, json).map_err(|source| PlanError::Io {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), stage = ?schedule.completed_stage(), "schedule saved");
    Ok(())
}

/// Reads a schedule from `path`.
pub fn load_schedule(path: impl AsRef<Path>) -> Result<Schedule, PlanError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let schedule: Schedule = serde_json::from_str(&json)?;
    debug!(path = %path.display(), stage = ?schedule.completed_stage(), "schedule loaded");
    Ok(schedule)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "schedule.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RotationConfig, StageOutcome, Unit};
    use tempfile::tempdir;

    fn bench_only() -> Schedule {
        let config = RotationConfig::new(5, 1, 2);
        let mut s = Schedule::empty(&config);
        s.set_bench(vec![vec![4], vec![0]], StageOutcome::trivial());
        s
    }

    #[test]
    fn test_round_trip_bench_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let s = bench_only();
        save_schedule(&path, &s).unwrap();
        let loaded = load_schedule(&path).unwrap();
        assert_eq!(loaded, s);
        assert!(loaded.has_bench());
        assert!(!loaded.has_groups());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_round_trip_with_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut s = bench_only();
        s.set_groups(
            vec![vec![Unit::new([0, 1, 2, 3])], vec![Unit::new([1, 2, 3, 4])]],
            StageOutcome::trivial(),
        );
        save_schedule(&path, &s).unwrap();
        let loaded = load_schedule(&path).unwrap();
        assert_eq!(loaded, s);
        assert!(loaded.has_groups());
    }

    #[test]
    fn test_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_schedule(&path, &bench_only()).unwrap();
        let mut s = bench_only();
        s.set_bench(vec![vec![1], vec![2]], StageOutcome::trivial());
        save_schedule(&path, &s).unwrap();
        assert_eq!(load_schedule(&path).unwrap().rounds[0].bench, vec![1]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_schedule(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_schedule(&path), Err(PlanError::Format(_))));
    }
}
