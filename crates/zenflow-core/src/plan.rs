//! Plan templates: the durable definition of a task or habit.
//!
//! A template is immutable between edits. For `once` plans it also carries
//! the completion state; for recurring plans that state lives in
//! [`PlanInstance`](crate::instance::PlanInstance) rows instead.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "#E8E4F3";
pub const DEFAULT_EMOJI: &str = "🎯";
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

// ─── Recurrence ──────────────────────────────────────────────────────────────

/// How often a plan repeats. Everything except [`RepeatType::Once`] is
/// recurring.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepeatType {
  #[default]
  Once,
  Daily,
  Weekly,
  Biweekly,
  Monthly,
  Weekdays,
  Weekends,
  Custom,
}

impl RepeatType {
  pub fn is_recurring(self) -> bool { self != Self::Once }
}

// ─── Checklist ───────────────────────────────────────────────────────────────

/// One entry of a plan's ordered checklist. Display-only; never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
  pub text: String,
  #[serde(default)]
  pub done: bool,
}

// ─── PlanTemplate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTemplate {
  pub id:                      Uuid,
  pub user_id:                 Uuid,
  pub name:                    String,
  pub color:                   String,
  pub emoji:                   String,
  pub duration_minutes:        u32,
  pub notes:                   String,
  pub checklist:               Vec<ChecklistItem>,
  /// Calendar date for `once` plans; the recurrence anchor otherwise.
  pub scheduled_date:          Option<NaiveDate>,
  /// No fixed time slot; such plans normally carry no start/end time.
  pub is_anytime:              bool,
  pub repeat_type:             RepeatType,
  /// Wall-clock time such as `"6:00 PM"`, parsed at evaluation time.
  pub start_time:              Option<String>,
  pub end_time:                Option<String>,
  pub reminder_at_start:       bool,
  pub reminder_at_end:         bool,
  /// Minutes before `start_time` for the pre-start reminder; 0 disables it.
  pub reminder_before_minutes: u32,
  /// Authoritative only for `once` plans.
  pub is_completed:            bool,
  /// Authoritative only for `once` plans.
  pub is_skipped:              bool,
  pub created_at:              DateTime<Utc>,
  pub updated_at:              DateTime<Utc>,
}

impl PlanTemplate {
  pub fn is_recurring(&self) -> bool { self.repeat_type.is_recurring() }

  /// Whether this plan has an occurrence on `date`.
  pub fn occurs_on(&self, date: NaiveDate) -> bool {
    self.repeat_type.occurs_on(self.scheduled_date, date)
  }
}

// ─── NewPlan ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::PlanStore::create_plan`]. Identity, timestamps
/// and completion flags are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
  pub user_id:                 Uuid,
  pub name:                    String,
  pub color:                   String,
  pub emoji:                   String,
  pub duration_minutes:        u32,
  pub notes:                   String,
  pub checklist:               Vec<ChecklistItem>,
  pub scheduled_date:          Option<NaiveDate>,
  pub is_anytime:              bool,
  pub repeat_type:             RepeatType,
  pub start_time:              Option<String>,
  pub end_time:                Option<String>,
  pub reminder_at_start:       bool,
  pub reminder_at_end:         bool,
  pub reminder_before_minutes: u32,
}

impl NewPlan {
  /// A `once` plan with display defaults and no reminders.
  pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
    Self {
      user_id,
      name: name.into(),
      color: DEFAULT_COLOR.to_owned(),
      emoji: DEFAULT_EMOJI.to_owned(),
      duration_minutes: DEFAULT_DURATION_MINUTES,
      notes: String::new(),
      checklist: Vec::new(),
      scheduled_date: None,
      is_anytime: false,
      repeat_type: RepeatType::Once,
      start_time: None,
      end_time: None,
      reminder_at_start: false,
      reminder_at_end: false,
      reminder_before_minutes: 0,
    }
  }
}

// ─── PlanPatch ───────────────────────────────────────────────────────────────

/// A partial edit of a template. `None` leaves a field untouched; for the
/// optional columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanPatch {
  pub name:                    Option<String>,
  pub color:                   Option<String>,
  pub emoji:                   Option<String>,
  pub duration_minutes:        Option<u32>,
  pub notes:                   Option<String>,
  pub checklist:               Option<Vec<ChecklistItem>>,
  pub scheduled_date:          Option<Option<NaiveDate>>,
  pub is_anytime:              Option<bool>,
  pub repeat_type:             Option<RepeatType>,
  pub start_time:              Option<Option<String>>,
  pub end_time:                Option<Option<String>>,
  pub reminder_at_start:       Option<bool>,
  pub reminder_at_end:         Option<bool>,
  pub reminder_before_minutes: Option<u32>,
}

impl PlanPatch {
  /// Apply the patch to `plan` in memory. Does not touch `updated_at`.
  pub fn apply(self, plan: &mut PlanTemplate) {
    if let Some(v) = self.name {
      plan.name = v;
    }
    if let Some(v) = self.color {
      plan.color = v;
    }
    if let Some(v) = self.emoji {
      plan.emoji = v;
    }
    if let Some(v) = self.duration_minutes {
      plan.duration_minutes = v;
    }
    if let Some(v) = self.notes {
      plan.notes = v;
    }
    if let Some(v) = self.checklist {
      plan.checklist = v;
    }
    if let Some(v) = self.scheduled_date {
      plan.scheduled_date = v;
    }
    if let Some(v) = self.is_anytime {
      plan.is_anytime = v;
    }
    if let Some(v) = self.repeat_type {
      plan.repeat_type = v;
    }
    if let Some(v) = self.start_time {
      plan.start_time = v;
    }
    if let Some(v) = self.end_time {
      plan.end_time = v;
    }
    if let Some(v) = self.reminder_at_start {
      plan.reminder_at_start = v;
    }
    if let Some(v) = self.reminder_at_end {
      plan.reminder_at_end = v;
    }
    if let Some(v) = self.reminder_before_minutes {
      plan.reminder_before_minutes = v;
    }
  }
}

// ─── Template flags ──────────────────────────────────────────────────────────

/// A single-column edit of a `once` plan's completion flags, applied by the
/// store against the stored row rather than a caller's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagChange {
  SetCompleted(bool),
  /// Setting the flag is refused while the stored row is completed.
  SetSkipped(bool),
  ToggleCompleted,
  /// Refused while the stored row is completed.
  ToggleSkipped,
  /// Clear both flags.
  Clear,
}

impl FlagChange {
  /// Whether the store must refuse this change on a completed row.
  pub fn requires_not_completed(self) -> bool {
    matches!(self, Self::SetSkipped(true) | Self::ToggleSkipped)
  }
}

/// Result of [`crate::store::PlanStore::change_plan_flags`].
#[derive(Debug, Clone)]
pub enum FlagWrite {
  Updated(PlanTemplate),
  /// The stored row is completed and the change would skip it.
  Conflict,
  /// Absent or owned by someone else.
  NotFound,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn repeat_type_string_forms() {
    assert_eq!(RepeatType::Biweekly.to_string(), "biweekly");
    assert_eq!(RepeatType::from_str("weekends").unwrap(), RepeatType::Weekends);
    assert!(RepeatType::from_str("fortnightly").is_err());
    assert_eq!(
      serde_json::to_string(&RepeatType::Weekdays).unwrap(),
      "\"weekdays\""
    );
  }

  #[test]
  fn only_once_is_not_recurring() {
    assert!(!RepeatType::Once.is_recurring());
    for rt in [
      RepeatType::Daily,
      RepeatType::Weekly,
      RepeatType::Biweekly,
      RepeatType::Monthly,
      RepeatType::Weekdays,
      RepeatType::Weekends,
      RepeatType::Custom,
    ] {
      assert!(rt.is_recurring(), "{rt} should be recurring");
    }
  }

  #[test]
  fn patch_clears_optional_time() {
    let now = Utc::now();
    let mut plan = PlanTemplate {
      id:                      Uuid::new_v4(),
      user_id:                 Uuid::new_v4(),
      name:                    "Read".into(),
      color:                   DEFAULT_COLOR.into(),
      emoji:                   DEFAULT_EMOJI.into(),
      duration_minutes:        30,
      notes:                   String::new(),
      checklist:               vec![],
      scheduled_date:          None,
      is_anytime:              false,
      repeat_type:             RepeatType::Daily,
      start_time:              Some("7:00 AM".into()),
      end_time:                Some("7:30 AM".into()),
      reminder_at_start:       true,
      reminder_at_end:         false,
      reminder_before_minutes: 0,
      is_completed:            false,
      is_skipped:              false,
      created_at:              now,
      updated_at:              now,
    };

    PlanPatch {
      name: Some("Read fiction".into()),
      end_time: Some(None),
      ..Default::default()
    }
    .apply(&mut plan);

    assert_eq!(plan.name, "Read fiction");
    assert_eq!(plan.start_time.as_deref(), Some("7:00 AM"));
    assert!(plan.end_time.is_none());
    assert!(plan.reminder_at_start);
  }
}
