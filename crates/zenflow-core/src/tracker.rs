//! The instance tracker: completion and skip marking for plan occurrences.
//!
//! `once` plans keep their state on the template. Recurring plans get one
//! [`PlanInstance`] per calendar date, created lazily on first mark.
//!
//! The recurring path is read-then-write. A concurrent duplicate request can
//! lose the insert; the store reports that as
//! [`InsertOutcome::AlreadyExists`] and the loser updates the winner's row
//! instead, so the `(plan_id, instance_date)` key stays unique. The final
//! flags are last-write-wins.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  instance::{InsertOutcome, NewInstance, OccurrenceState, PlanInstance},
  plan::{FlagChange, FlagWrite, PlanTemplate},
  store::PlanStore,
  window::today,
};

/// The row a mark was written to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scope", content = "record", rename_all = "snake_case")]
pub enum Occurrence {
  /// A `once` plan; the template itself carries the state.
  Template(PlanTemplate),
  /// One dated occurrence of a recurring plan.
  Instance(PlanInstance),
}

impl Occurrence {
  pub fn is_completed(&self) -> bool {
    match self {
      Self::Template(p) => p.is_completed,
      Self::Instance(i) => i.is_completed,
    }
  }

  pub fn is_skipped(&self) -> bool {
    match self {
      Self::Template(p) => p.is_skipped,
      Self::Instance(i) => i.is_skipped,
    }
  }
}

/// Records completion and skip state for plan occurrences.
///
/// Callers pass a template they have already loaded and ownership-checked.
/// Store failures surface as [`Error::Store`] and are never retried here.
pub struct InstanceTracker<S> {
  store: Arc<S>,
}

impl<S> Clone for InstanceTracker<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: PlanStore> InstanceTracker<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Set the state of `plan`'s occurrence on `target_date` (today if
  /// `None`; ignored for `once` plans).
  ///
  /// For `once` plans, `Completed` and `Skipped` set only their own flag
  /// and `Pending` clears both. Skipping a completed `once` plan is a
  /// [`Error::Conflict`].
  pub async fn set_occurrence_state(
    &self,
    plan: &PlanTemplate,
    target_date: Option<NaiveDate>,
    state: OccurrenceState,
    now: DateTime<Utc>,
  ) -> Result<Occurrence> {
    if plan.is_recurring() {
      let date = target_date.unwrap_or_else(|| today(now));
      return self.upsert_instance(plan, date, state, now).await;
    }

    let change = match state {
      OccurrenceState::Completed => FlagChange::SetCompleted(true),
      OccurrenceState::Skipped => FlagChange::SetSkipped(true),
      OccurrenceState::Pending => FlagChange::Clear,
    };
    self.write_template(plan, change).await
  }

  /// Flip completion of a `once` plan, or mark a recurring occurrence
  /// completed.
  pub async fn toggle_completion(
    &self,
    plan: &PlanTemplate,
    target_date: Option<NaiveDate>,
    now: DateTime<Utc>,
  ) -> Result<Occurrence> {
    if plan.is_recurring() {
      return self
        .set_occurrence_state(plan, target_date, OccurrenceState::Completed, now)
        .await;
    }
    self.write_template(plan, FlagChange::ToggleCompleted).await
  }

  /// Flip the skip flag of a `once` plan, or mark a recurring occurrence
  /// skipped.
  pub async fn toggle_skip(
    &self,
    plan: &PlanTemplate,
    target_date: Option<NaiveDate>,
    now: DateTime<Utc>,
  ) -> Result<Occurrence> {
    if plan.is_recurring() {
      return self
        .set_occurrence_state(plan, target_date, OccurrenceState::Skipped, now)
        .await;
    }
    self.write_template(plan, FlagChange::ToggleSkipped).await
  }

  /// `change` is applied to the stored row; `plan` only supplies the key.
  async fn write_template(&self, plan: &PlanTemplate, change: FlagChange) -> Result<Occurrence> {
    match self
      .store
      .change_plan_flags(plan.id, plan.user_id, change)
      .await
      .map_err(Error::store)?
    {
      FlagWrite::Updated(updated) => Ok(Occurrence::Template(updated)),
      FlagWrite::Conflict => Err(Error::Conflict("cannot skip a completed plan".into())),
      FlagWrite::NotFound => Err(Error::PlanNotFound(plan.id)),
    }
  }

  async fn upsert_instance(
    &self,
    plan: &PlanTemplate,
    date: NaiveDate,
    state: OccurrenceState,
    now: DateTime<Utc>,
  ) -> Result<Occurrence> {
    if let Some(existing) = self
      .store
      .find_instance(plan.id, date)
      .await
      .map_err(Error::store)?
    {
      return self.update_instance(plan, date, &existing, state, now).await;
    }

    let input = NewInstance {
      plan_id: plan.id,
      user_id: plan.user_id,
      instance_date: date,
      state,
      now,
    };
    match self.store.insert_instance(input).await.map_err(Error::store)? {
      InsertOutcome::Inserted(instance) => Ok(Occurrence::Instance(instance)),
      InsertOutcome::AlreadyExists => {
        let existing = self
          .store
          .find_instance(plan.id, date)
          .await
          .map_err(Error::store)?
          .ok_or(Error::InstanceNotFound { plan_id: plan.id, date })?;
        self.update_instance(plan, date, &existing, state, now).await
      }
    }
  }

  async fn update_instance(
    &self,
    plan: &PlanTemplate,
    date: NaiveDate,
    existing: &PlanInstance,
    state: OccurrenceState,
    now: DateTime<Utc>,
  ) -> Result<Occurrence> {
    let updated = self
      .store
      .update_instance(existing.id, state, state.completed_at(now))
      .await
      .map_err(Error::store)?
      .ok_or(Error::InstanceNotFound { plan_id: plan.id, date })?;
    Ok(Occurrence::Instance(updated))
  }
}
