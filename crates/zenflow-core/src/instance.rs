//! Per-occurrence state of recurring plans.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Completion/skip record for one calendar occurrence of a recurring plan.
///
/// At most one row exists per `(plan_id, instance_date)`. Rows are created
/// lazily by the tracker and only ever removed together with their plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInstance {
  pub id:            Uuid,
  pub plan_id:       Uuid,
  /// Denormalised from the owning template.
  pub user_id:       Uuid,
  pub instance_date: NaiveDate,
  pub is_completed:  bool,
  pub is_skipped:    bool,
  /// Set when the occurrence last transitioned into completed.
  pub completed_at:  Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// The desired state of one occurrence. Completed and skipped are mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceState {
  Pending,
  Completed,
  Skipped,
}

impl OccurrenceState {
  pub fn is_completed(self) -> bool { self == Self::Completed }

  pub fn is_skipped(self) -> bool { self == Self::Skipped }

  /// The `completed_at` value to store for this state.
  pub fn completed_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    self.is_completed().then_some(now)
  }
}

/// Input to [`crate::store::PlanStore::insert_instance`].
#[derive(Debug, Clone)]
pub struct NewInstance {
  pub plan_id:       Uuid,
  pub user_id:       Uuid,
  pub instance_date: NaiveDate,
  pub state:         OccurrenceState,
  pub now:           DateTime<Utc>,
}

/// Result of an insert keyed on `(plan_id, instance_date)`.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
  Inserted(PlanInstance),
  /// Another writer created the row first; nothing was written.
  AlreadyExists,
}
