//! Workout progression engine.
//!
//! Walks a user through the exercises of a plan:
//! - `start_run` reclaims stale active records and activates the first exercise
//! - `advance_run` completes the active exercise and activates the next one,
//!   or removes the run's records once the plan is exhausted
//!
//! Each operation is a single [`SessionStore::transact`] call, so concurrent
//! callers never both see "no active record" and a failure part-way leaves
//! storage untouched.

use crate::catalog::PlanCatalog;
use crate::progression::next_exercise;
use crate::store::{SessionStore, SessionTable};
use crate::{Error, PlanId, Result, RunOutcome, RunSummary, SessionRecord};
use chrono::Utc;
use uuid::Uuid;

/// Drives workout runs against a plan catalog and a session store
#[derive(Debug)]
pub struct ProgressionEngine<C, S> {
    catalog: C,
    store: S,
}

impl<C: PlanCatalog, S: SessionStore> ProgressionEngine<C, S> {
    pub fn new(catalog: C, store: S) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a run of `plan_id` for `user_id`, returning the first active record
    ///
    /// Fails with `NotFound` for an unknown plan and `InvalidArgument` for a
    /// non-positive rest interval or a plan without exercises. Incomplete
    /// records the user left behind are marked completed first.
    pub fn start_run(
        &self,
        user_id: &str,
        plan_id: PlanId,
        rest_interval: i64,
    ) -> Result<SessionRecord> {
        let exercises = self.catalog.exercises_for(plan_id)?;
        let rest_interval = validate_rest_interval(rest_interval)?;

        self.store.transact(|table| {
            let reclaimed = reclaim_stale(table, user_id, plan_id)?;
            if reclaimed > 0 {
                tracing::info!(
                    "Reclaimed {} stale session(s) for {} before starting plan {}",
                    reclaimed,
                    user_id,
                    plan_id
                );
            }

            let first = exercises
                .first()
                .ok_or_else(|| Error::InvalidArgument("no exercises in plan".into()))?;

            let record = table.create(SessionRecord::new(
                user_id,
                plan_id,
                Uuid::new_v4(),
                0,
                first,
                rest_interval,
            ));

            tracing::info!(
                "Started plan {} for {}: '{}' ({} exercises, {}s rest)",
                plan_id,
                user_id,
                record.exercise_name,
                exercises.len(),
                rest_interval
            );
            Ok(record)
        })
    }

    /// Complete the user's active exercise and move to the next one
    ///
    /// Returns [`RunOutcome::Finished`] after the last exercise, at which
    /// point every record of the run has been deleted.
    pub fn advance_run(&self, user_id: &str) -> Result<RunOutcome> {
        self.store.transact(|table| {
            let current = table
                .find_active(user_id)
                .ok_or_else(|| Error::NotFound("no active workout session".into()))?;

            table.mark_completed(current.id)?;
            tracing::debug!(
                "Completed '{}' (position {}) of plan {} for {}",
                current.exercise_name,
                current.position,
                current.plan_id,
                user_id
            );

            let exercises = self.catalog.exercises_for(current.plan_id)?;
            let completed = table.find_completed(user_id, current.plan_id, current.run_id);

            if let Some((position, entry)) = next_exercise(&exercises, &completed) {
                let next = table.create(SessionRecord::new(
                    user_id,
                    current.plan_id,
                    current.run_id,
                    position,
                    entry,
                    current.rest_interval,
                ));
                tracing::info!(
                    "Next exercise for {}: '{}' ({}/{})",
                    user_id,
                    next.exercise_name,
                    position + 1,
                    exercises.len()
                );
                return Ok(RunOutcome::Next { session: next });
            }

            let summary = finish_run(table, &current, exercises.len());
            tracing::info!(
                "Finished plan {} for {} after {} exercises",
                summary.plan_id,
                user_id,
                summary.exercises_completed
            );
            Ok(RunOutcome::Finished { summary })
        })
    }

    /// The user's active record, if a run is in progress
    pub fn active_session(&self, user_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.store.snapshot()?.find_active(user_id))
    }
}

fn validate_rest_interval(rest_interval: i64) -> Result<u32> {
    if rest_interval <= 0 {
        return Err(Error::InvalidArgument(format!(
            "rest interval must be a positive number of seconds, got {}",
            rest_interval
        )));
    }
    u32::try_from(rest_interval).map_err(|_| {
        Error::InvalidArgument(format!("rest interval {} is too large", rest_interval))
    })
}

/// Mark every incomplete record of the user as completed.
///
/// Covers the plan being started as well as any other plan, so the user
/// never ends up with two active records.
fn reclaim_stale(table: &mut SessionTable, user_id: &str, plan_id: PlanId) -> Result<usize> {
    let mut reclaimed = 0;

    for stale in table.find_active_for_plan(user_id, plan_id) {
        table.mark_completed(stale.id)?;
        reclaimed += 1;
    }

    while let Some(other) = table.find_active(user_id) {
        tracing::warn!(
            "Abandoning active session on plan {} for {}",
            other.plan_id,
            user_id
        );
        table.mark_completed(other.id)?;
        reclaimed += 1;
    }

    Ok(reclaimed)
}

/// Delete the run's records and summarize it
fn finish_run(table: &mut SessionTable, last: &SessionRecord, total: usize) -> RunSummary {
    let started_at = table
        .records_for_plan(&last.user_id, last.plan_id)
        .iter()
        .filter(|r| r.run_id == last.run_id)
        .map(|r| r.created_at)
        .min()
        .unwrap_or(last.created_at);

    let removed = table.delete_all_for_plan(&last.user_id, last.plan_id);
    tracing::debug!(
        "Removed {} session records for plan {} of {}",
        removed,
        last.plan_id,
        last.user_id
    );

    RunSummary {
        user_id: last.user_id.clone(),
        plan_id: last.plan_id,
        exercises_completed: total,
        rest_interval: last.rest_interval,
        started_at,
        finished_at: Utc::now(),
    }
}
