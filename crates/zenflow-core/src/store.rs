//! The `PlanStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `zenflow-store-sqlite`).
//! The tracker and the reminder engine depend on this abstraction, not on any
//! concrete backend. Every operation touches rows of a single plan, date or
//! user; no cross-table transactions are assumed.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  instance::{InsertOutcome, NewInstance, OccurrenceState, PlanInstance},
  plan::{FlagChange, FlagWrite, NewPlan, PlanPatch, PlanTemplate},
  push::PushAddress,
};

/// Abstraction over the keyed record store holding plans, instances and
/// push addresses.
///
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded runtime.
pub trait PlanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Templates ─────────────────────────────────────────────────────────

  /// Persist a new template. Identity and timestamps are set by the store.
  fn create_plan(
    &self,
    input: NewPlan,
  ) -> impl Future<Output = Result<PlanTemplate, Self::Error>> + Send + '_;

  /// Fetch a template owned by `user_id`. `None` if absent or owned by
  /// someone else.
  fn get_plan(
    &self,
    id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<PlanTemplate>, Self::Error>> + Send + '_;

  /// All templates of a user, ordered by `scheduled_date` (undated last).
  fn list_plans(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PlanTemplate>, Self::Error>> + Send + '_;

  /// Apply a partial edit. `None` if the template is absent or not owned.
  fn update_plan(
    &self,
    id: Uuid,
    user_id: Uuid,
    patch: PlanPatch,
  ) -> impl Future<Output = Result<Option<PlanTemplate>, Self::Error>> + Send + '_;

  /// Apply `change` to the template-level flags (`once` plans). Only the
  /// named column is written, and skip changes are checked against the
  /// stored `is_completed` in the same statement.
  fn change_plan_flags(
    &self,
    id: Uuid,
    user_id: Uuid,
    change: FlagChange,
  ) -> impl Future<Output = Result<FlagWrite, Self::Error>> + Send + '_;

  /// Delete a template and its instances. Returns whether a row was removed.
  fn delete_plan(
    &self,
    id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove everything a user owns: templates, instances, push addresses.
  /// Returns the number of templates deleted.
  fn purge_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Templates the reminder scan must consider for `date`: `once` plans
  /// scheduled on that date and not completed, plus every recurring plan.
  /// Recurrence patterns are evaluated by the caller.
  fn plans_for_scan(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<PlanTemplate>, Self::Error>> + Send + '_;

  // ── Instances ─────────────────────────────────────────────────────────

  fn find_instance(
    &self,
    plan_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<PlanInstance>, Self::Error>> + Send + '_;

  /// Insert keyed on `(plan_id, instance_date)`. Never overwrites an
  /// existing row; reports [`InsertOutcome::AlreadyExists`] instead.
  fn insert_instance(
    &self,
    input: NewInstance,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Overwrite the flags of an existing instance. `completed_at` is stored
  /// as given. `None` if the row no longer exists.
  fn update_instance(
    &self,
    id: Uuid,
    state: OccurrenceState,
    completed_at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Option<PlanInstance>, Self::Error>> + Send + '_;

  /// All instances of a plan, ordered by date.
  fn list_instances(
    &self,
    plan_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PlanInstance>, Self::Error>> + Send + '_;

  // ── Push addresses ────────────────────────────────────────────────────

  /// Register `address` for `user_id`. Re-registering an address moves it to
  /// the given user.
  fn register_push_address(
    &self,
    user_id: Uuid,
    address: String,
  ) -> impl Future<Output = Result<PushAddress, Self::Error>> + Send + '_;

  fn remove_push_address<'a>(
    &'a self,
    address: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Addresses registered by any of `user_ids`.
  fn push_addresses_for<'a>(
    &'a self,
    user_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<PushAddress>, Self::Error>> + Send + 'a;

  /// Every registered address string.
  fn all_push_addresses(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
