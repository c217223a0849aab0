//! Core domain types for the workout-mode system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Library exercises and plan exercise entries
//! - Workout plans
//! - Session records tracking progress through a plan
//! - Run outcomes and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Identifier of a workout plan
pub type PlanId = u64;

// ============================================================================
// Exercise Types
// ============================================================================

/// An exercise from the built-in library (e.g., "Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub target_muscles: String,
    pub difficulty: u8,
}

/// One exercise slot of a workout plan, in catalog order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseEntry {
    pub name: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    /// Target duration in seconds (timed exercises)
    #[serde(default)]
    pub duration: Option<u32>,
    /// Target distance in kilometres
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub target_muscles: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl ExerciseEntry {
    /// Entry with only a name and set/rep targets
    pub fn new(name: impl Into<String>, sets: Option<u32>, reps: Option<u32>) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            duration: None,
            distance: None,
            difficulty: None,
            target_muscles: None,
            instructions: None,
        }
    }
}

// ============================================================================
// Plan Types
// ============================================================================

/// A stored workout plan owned by one user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: PlanId,
    pub user_id: String,
    pub name: String,
    pub frequency: Option<String>,
    pub goal: Option<String>,
    /// Planned session length in minutes
    pub session_duration: Option<u32>,
    pub exercises: Vec<ExerciseEntry>,
}

/// Input for creating a plan, before exercise names are resolved
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanDraft {
    pub name: String,
    pub frequency: Option<String>,
    pub goal: Option<String>,
    pub session_duration: Option<u32>,
    pub exercises: Vec<ExerciseEntry>,
}

// ============================================================================
// Session Types
// ============================================================================

/// One (user, plan, exercise) attempt within a workout run.
///
/// At most one record per user has `completed == false`; that record is the
/// exercise currently in progress.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub plan_id: PlanId,
    /// Shared by every record of one run, from start to finish or abandonment
    pub run_id: Uuid,
    /// Index of the exercise in the plan's list when the record was created
    pub position: usize,
    pub exercise_name: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    /// Rest between sets, in seconds
    pub rest_interval: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Build a fresh, incomplete record for `entry` at `position` in the plan.
    pub fn new(
        user_id: &str,
        plan_id: PlanId,
        run_id: Uuid,
        position: usize,
        entry: &ExerciseEntry,
        rest_interval: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            plan_id,
            run_id,
            position,
            exercise_name: entry.name.clone(),
            sets: entry.sets,
            reps: entry.reps,
            rest_interval,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }
}

/// Exercises already completed within one run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletedSet {
    pub positions: BTreeSet<usize>,
}

impl CompletedSet {
    pub fn contains_position(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// ============================================================================
// Run Outcome Types
// ============================================================================

/// Summary of a finished run, produced just before its records are removed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub user_id: String,
    pub plan_id: PlanId,
    pub exercises_completed: usize,
    pub rest_interval: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of advancing a run
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The next exercise is now active
    Next { session: SessionRecord },
    /// Every exercise of the plan is done and the run was cleaned up
    Finished { summary: RunSummary },
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished { .. })
    }

    /// The newly active record, if the run continues
    pub fn session(&self) -> Option<&SessionRecord> {
        match self {
            RunOutcome::Next { session } => Some(session),
            RunOutcome::Finished { .. } => None,
        }
    }
}
