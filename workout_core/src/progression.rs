//! Sequencing rules for walking through a plan.
//!
//! Progression is positional: an entry counts as done when its index in the
//! plan appears in the completed set, so a plan listing the same exercise
//! twice visits it twice.

use crate::{CompletedSet, ExerciseEntry};

/// First entry, in catalog order, whose position has not been completed
pub fn next_exercise<'a>(
    exercises: &'a [ExerciseEntry],
    completed: &CompletedSet,
) -> Option<(usize, &'a ExerciseEntry)> {
    exercises
        .iter()
        .enumerate()
        .find(|(position, _)| !completed.contains_position(*position))
}
