//! Exercise library and the plan catalog contract.
//!
//! The library is the set of exercises plans may reference; the
//! [`PlanCatalog`] trait is what the progression engine uses to resolve a
//! plan into its ordered exercise list.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Resolves a plan identifier to its exercises, in catalog order.
///
/// Implementations return [`crate::Error::NotFound`] for unknown plans. The
/// returned vector is a snapshot; later catalog edits do not affect it.
pub trait PlanCatalog {
    fn exercises_for(&self, plan_id: PlanId) -> Result<Vec<ExerciseEntry>>;
}

impl<C: PlanCatalog + ?Sized> PlanCatalog for &C {
    fn exercises_for(&self, plan_id: PlanId) -> Result<Vec<ExerciseEntry>> {
        (**self).exercises_for(plan_id)
    }
}

impl PlanCatalog for HashMap<PlanId, Vec<ExerciseEntry>> {
    fn exercises_for(&self, plan_id: PlanId) -> Result<Vec<ExerciseEntry>> {
        self.get(&plan_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("workout plan {} not found", plan_id)))
    }
}

/// The set of exercises plans can be built from
#[derive(Clone, Debug)]
pub struct Library {
    pub exercises: Vec<Exercise>,
}

/// Cached default library - built once and reused across all operations
static DEFAULT_LIBRARY: Lazy<Library> = Lazy::new(build_default_library);

/// Get a reference to the cached default library
pub fn get_default_library() -> &'static Library {
    &DEFAULT_LIBRARY
}

fn exercise(
    id: u32,
    name: &str,
    description: &str,
    instructions: &str,
    target_muscles: &str,
    difficulty: u8,
) -> Exercise {
    Exercise {
        id,
        name: name.into(),
        description: description.into(),
        instructions: instructions.into(),
        target_muscles: target_muscles.into(),
        difficulty,
    }
}

/// Builds the default library of built-in exercises
pub fn build_default_library() -> Library {
    let exercises = vec![
        exercise(
            1,
            "Push-up",
            "Bodyweight horizontal press",
            "Hands under shoulders, lower chest to the floor, press back up",
            "chest, triceps, shoulders",
            1,
        ),
        exercise(
            2,
            "Squat",
            "Barbell back squat",
            "Bar on upper back, sit down between the hips, drive up through mid-foot",
            "quadriceps, glutes",
            3,
        ),
        exercise(
            3,
            "Bench Press",
            "Barbell flat bench press",
            "Lower the bar to mid-chest, press to lockout",
            "chest, triceps",
            3,
        ),
        exercise(
            4,
            "Deadlift",
            "Conventional barbell deadlift",
            "Hinge at the hips, keep the bar close, stand tall",
            "hamstrings, glutes, back",
            4,
        ),
        exercise(
            5,
            "Pull-up",
            "Bodyweight vertical pull",
            "Dead hang, pull chin over the bar, lower under control",
            "lats, biceps",
            3,
        ),
        exercise(
            6,
            "Overhead Press",
            "Standing barbell press",
            "Brace, press the bar overhead, finish with biceps by the ears",
            "shoulders, triceps",
            3,
        ),
        exercise(
            7,
            "Barbell Row",
            "Bent-over barbell row",
            "Hinge to 45 degrees, row the bar to the lower chest",
            "back, biceps",
            3,
        ),
        exercise(
            8,
            "Lunge",
            "Alternating forward lunge",
            "Step forward, lower the back knee, push back to standing",
            "quadriceps, glutes",
            2,
        ),
        exercise(
            9,
            "Plank",
            "Isometric front plank",
            "Forearms under shoulders, hold a straight line from head to heels",
            "core",
            1,
        ),
        exercise(
            10,
            "Running",
            "Steady-state run",
            "Keep a conversational pace for the target duration or distance",
            "legs, cardiovascular",
            2,
        ),
        exercise(
            11,
            "Kettlebell Swing",
            "Two-hand kettlebell swing",
            "Hike the bell back, snap the hips, float it to chest height",
            "glutes, hamstrings",
            2,
        ),
        exercise(
            12,
            "Burpee",
            "Squat thrust with jump",
            "Drop to a plank, chest to floor, jump the feet in, jump up",
            "full body",
            2,
        ),
    ];

    Library { exercises }
}

impl Library {
    /// Look up an exercise by name, ignoring case and surrounding whitespace
    pub fn lookup(&self, name: &str) -> Option<&Exercise> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        self.exercises
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
    }

    /// Validate the library and return a list of errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for exercise in &self.exercises {
            if !ids.insert(exercise.id) {
                errors.push(format!("Duplicate exercise id {}", exercise.id));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise {} has an empty name", exercise.id));
            }
            if !names.insert(exercise.name.to_lowercase()) {
                errors.push(format!("Duplicate exercise name '{}'", exercise.name));
            }
            if !(1..=5).contains(&exercise.difficulty) {
                errors.push(format!(
                    "Exercise '{}': difficulty {} outside 1-5",
                    exercise.name, exercise.difficulty
                ));
            }
        }

        if self.exercises.is_empty() {
            errors.push("Library has no exercises".to_string());
        }

        errors
    }
}
