//! Finished-run history kept as CSV.
//!
//! Session records are deleted when a run finishes, so the run's summary is
//! appended here to keep a record of completed workouts.

use crate::{Error, PlanId, Result, RunSummary};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the history CSV
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    user_id: String,
    plan_id: PlanId,
    exercises_completed: usize,
    rest_interval: u32,
    started_at: String,
    finished_at: String,
}

impl From<&RunSummary> for CsvRow {
    fn from(summary: &RunSummary) -> Self {
        CsvRow {
            user_id: summary.user_id.clone(),
            plan_id: summary.plan_id,
            exercises_completed: summary.exercises_completed,
            rest_interval: summary.rest_interval,
            started_at: summary.started_at.to_rfc3339(),
            finished_at: summary.finished_at.to_rfc3339(),
        }
    }
}

impl TryFrom<CsvRow> for RunSummary {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let parse = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Storage(format!("Invalid date '{}': {}", value, e)))
        };

        Ok(RunSummary {
            started_at: parse(&row.started_at)?,
            finished_at: parse(&row.finished_at)?,
            user_id: row.user_id,
            plan_id: row.plan_id,
            exercises_completed: row.exercises_completed,
            rest_interval: row.rest_interval,
        })
    }
}

/// Append a finished run to the history file
///
/// Headers are written only when the file is new or empty. The file is
/// synced before returning.
pub fn append_run(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;

    let needs_headers = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(&file);

    writer.serialize(CsvRow::from(summary))?;
    writer.flush()?;
    drop(writer);

    file.sync_all()?;
    drop(file);

    tracing::debug!(
        "Recorded finished run of plan {} for {} in {:?}",
        summary.plan_id,
        summary.user_id,
        path
    );
    Ok(())
}

/// Load finished runs, newest first, optionally only for one user
///
/// Rows that cannot be parsed are logged and skipped.
pub fn load_run_history(path: &Path, user_id: Option<&str>) -> Result<Vec<RunSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut runs = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match RunSummary::try_from(row) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!("Failed to parse history row: {}", e),
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize history row: {}", e);
            }
        }
    }

    if let Some(user_id) = user_id {
        runs.retain(|r| r.user_id == user_id);
    }
    runs.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));

    tracing::debug!("Loaded {} finished runs from {:?}", runs.len(), path);
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(user: &str, plan: PlanId, hours_ago: i64) -> RunSummary {
        let finished_at = Utc::now() - Duration::hours(hours_ago);
        RunSummary {
            user_id: user.into(),
            plan_id: plan,
            exercises_completed: 3,
            rest_interval: 60,
            started_at: finished_at - Duration::minutes(40),
            finished_at,
        }
    }

    #[test]
    fn test_append_creates_file_with_headers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("runs.csv");

        append_run(&path, &summary("alice", 1, 2)).unwrap();
        append_run(&path, &summary("alice", 2, 1)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("user_id,plan_id"));
        assert_eq!(contents.matches("user_id").count(), 1);

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_history_sorted_newest_first_and_filtered() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("runs.csv");

        append_run(&path, &summary("alice", 1, 5)).unwrap();
        append_run(&path, &summary("bob", 7, 3)).unwrap();
        append_run(&path, &summary("alice", 2, 1)).unwrap();

        let runs = load_run_history(&path, Some("alice")).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].plan_id, 2);
        assert_eq!(runs[1].plan_id, 1);

        assert_eq!(load_run_history(&path, None).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_history_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let runs = load_run_history(&temp_dir.path().join("none.csv"), None).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("runs.csv");

        append_run(&path, &summary("alice", 1, 1)).unwrap();
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("alice,2,3,60,yesterday,today\n");
        contents.push_str("garbage\n");
        std::fs::write(&path, contents).unwrap();

        let runs = load_run_history(&path, None).unwrap();
        assert_eq!(runs.len(), 1);
    }
}
