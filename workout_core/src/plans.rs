//! Workout plan persistence.
//!
//! Plans are stored together in a single JSON document and saved atomically
//! (temp file + fsync + rename), mirroring how session state is written.
//! A sibling `.lock` file serializes writers: [`PlanBook::update`] holds it
//! exclusively from load to save, readers hold it shared.

use crate::catalog::{Library, PlanCatalog};
use crate::{Error, ExerciseEntry, PlanDraft, PlanId, Result, WorkoutPlan};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// All stored workout plans
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanBook {
    next_id: PlanId,
    pub plans: Vec<WorkoutPlan>,
}

impl Default for PlanBook {
    fn default() -> Self {
        Self {
            next_id: 1,
            plans: Vec::new(),
        }
    }
}

impl PlanBook {
    /// Load plans from a file with shared locking
    ///
    /// Returns an empty book if the file doesn't exist. A file that exists
    /// but cannot be parsed is an error: saving over it would drop plans.
    pub fn load(path: &Path) -> Result<Self> {
        Self::read(path, Ok)
    }

    /// Load the book and run `f` on it while no writer can change the file
    ///
    /// Work that must not race with plan removal (starting or advancing a
    /// run) happens inside `f`.
    pub fn read<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PlanBook) -> Result<T>,
    {
        let lock = open_lock(path)?;
        lock.lock_shared()?;

        let result = read_book(path).and_then(f);

        drop(lock);
        result
    }

    /// Load the book, modify it, and save it back under an exclusive lock
    ///
    /// Nothing is written when `f` fails.
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut PlanBook) -> Result<T>,
    {
        let lock = open_lock(path)?;
        lock.lock_exclusive()?;

        let result = read_book(path).and_then(|mut book| {
            let out = f(&mut book)?;
            book.save(path)?;
            Ok(out)
        });

        drop(lock);
        result
    }

    /// Write the book atomically; callers hold the exclusive lock
    fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Storage(format!("plan path {:?} has no parent", path)))?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} plans to {:?}", self.plans.len(), path);
        Ok(())
    }

    /// Catalog view limited to the plans `user_id` owns
    pub fn for_user<'a>(&'a self, user_id: &'a str) -> UserPlans<'a> {
        UserPlans {
            book: self,
            user_id,
        }
    }

    /// Create a plan for `user_id`, resolving every exercise against `library`.
    ///
    /// Names are matched case-insensitively and replaced by the library's
    /// canonical spelling; descriptive fields are copied from the library.
    pub fn create_plan(
        &mut self,
        user_id: &str,
        draft: PlanDraft,
        library: &Library,
    ) -> Result<WorkoutPlan> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("workout plan name is empty".into()));
        }

        let exercises = draft
            .exercises
            .into_iter()
            .map(|entry| resolve_entry(entry, library))
            .collect::<Result<Vec<_>>>()?;

        let plan = WorkoutPlan {
            id: self.next_id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            frequency: draft.frequency,
            goal: draft.goal,
            session_duration: draft.session_duration,
            exercises,
        };
        self.next_id += 1;
        self.plans.push(plan.clone());

        tracing::info!(
            "Created plan {} ('{}') with {} exercises for {}",
            plan.id,
            plan.name,
            plan.exercises.len(),
            user_id
        );
        Ok(plan)
    }

    /// Plans owned by `user_id`, in creation order
    pub fn plans_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a WorkoutPlan> + 'a {
        self.plans.iter().filter(move |p| p.user_id == user_id)
    }

    /// A single plan owned by `user_id`
    pub fn plan(&self, user_id: &str, plan_id: PlanId) -> Result<&WorkoutPlan> {
        self.plans
            .iter()
            .find(|p| p.id == plan_id && p.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("workout plan {} not found", plan_id)))
    }

    /// Remove a plan owned by `user_id`
    pub fn remove_plan(&mut self, user_id: &str, plan_id: PlanId) -> Result<WorkoutPlan> {
        let idx = self
            .plans
            .iter()
            .position(|p| p.id == plan_id && p.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("workout plan {} not found", plan_id)))?;
        let removed = self.plans.remove(idx);
        tracing::info!("Removed plan {} for {}", plan_id, user_id);
        Ok(removed)
    }
}

fn resolve_entry(entry: ExerciseEntry, library: &Library) -> Result<ExerciseEntry> {
    let exercise = library.lookup(&entry.name).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "exercise '{}' is not available in the library",
            entry.name.trim()
        ))
    })?;

    Ok(ExerciseEntry {
        name: exercise.name.clone(),
        difficulty: Some(exercise.difficulty),
        target_muscles: Some(exercise.target_muscles.clone()),
        instructions: Some(exercise.instructions.clone()),
        ..entry
    })
}

fn open_lock(path: &Path) -> Result<File> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("plan path {:?} has no parent", path)))?;
    std::fs::create_dir_all(parent)?;

    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path.with_extension("lock"))?;
    Ok(file)
}

fn read_book(path: &Path) -> Result<PlanBook> {
    if !path.exists() {
        tracing::debug!("No plan file at {:?}, starting empty", path);
        return Ok(PlanBook::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let book: PlanBook = serde_json::from_str(&contents)?;
    tracing::debug!("Loaded {} plans from {:?}", book.plans.len(), path);
    Ok(book)
}

/// Plans of one user, as seen by the progression engine
///
/// Plans owned by someone else resolve to `NotFound`.
#[derive(Clone, Copy, Debug)]
pub struct UserPlans<'a> {
    book: &'a PlanBook,
    user_id: &'a str,
}

impl PlanCatalog for UserPlans<'_> {
    fn exercises_for(&self, plan_id: PlanId) -> Result<Vec<ExerciseEntry>> {
        self.book
            .plan(self.user_id, plan_id)
            .map(|p| p.exercises.clone())
    }
}
