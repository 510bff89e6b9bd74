//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings and checklists are compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use zenflow_core::{
  instance::PlanInstance,
  plan::{ChecklistItem, PlanTemplate, RepeatType},
  push::PushAddress,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── RepeatType ──────────────────────────────────────────────────────────────

pub fn encode_repeat_type(rt: RepeatType) -> String { rt.to_string() }

pub fn decode_repeat_type(s: &str) -> Result<RepeatType> {
  s.parse()
    .map_err(|_| zenflow_core::Error::UnknownRepeatType(s.to_owned()).into())
}

// ─── Checklist ───────────────────────────────────────────────────────────────

pub fn encode_checklist(items: &[ChecklistItem]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_checklist(s: &str) -> Result<Vec<ChecklistItem>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPlan::from_row`].
pub const PLAN_COLUMNS: &str = "id, user_id, name, color, emoji, duration_minutes, \
   notes, checklist, scheduled_date, is_anytime, repeat_type, start_time, end_time, \
   reminder_at_start, reminder_at_end, reminder_before_minutes, is_completed, \
   is_skipped, created_at, updated_at";

/// Raw values read directly from a `daily_plans` row.
pub struct RawPlan {
  pub id:                      String,
  pub user_id:                 String,
  pub name:                    String,
  pub color:                   String,
  pub emoji:                   String,
  pub duration_minutes:        u32,
  pub notes:                   String,
  pub checklist:               String,
  pub scheduled_date:          Option<String>,
  pub is_anytime:              bool,
  pub repeat_type:             String,
  pub start_time:              Option<String>,
  pub end_time:                Option<String>,
  pub reminder_at_start:       bool,
  pub reminder_at_end:         bool,
  pub reminder_before_minutes: u32,
  pub is_completed:            bool,
  pub is_skipped:              bool,
  pub created_at:              String,
  pub updated_at:              String,
}

impl RawPlan {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get(0)?,
      user_id:                 row.get(1)?,
      name:                    row.get(2)?,
      color:                   row.get(3)?,
      emoji:                   row.get(4)?,
      duration_minutes:        row.get(5)?,
      notes:                   row.get(6)?,
      checklist:               row.get(7)?,
      scheduled_date:          row.get(8)?,
      is_anytime:              row.get(9)?,
      repeat_type:             row.get(10)?,
      start_time:              row.get(11)?,
      end_time:                row.get(12)?,
      reminder_at_start:       row.get(13)?,
      reminder_at_end:         row.get(14)?,
      reminder_before_minutes: row.get(15)?,
      is_completed:            row.get(16)?,
      is_skipped:              row.get(17)?,
      created_at:              row.get(18)?,
      updated_at:              row.get(19)?,
    })
  }

  pub fn into_plan(self) -> Result<PlanTemplate> {
    Ok(PlanTemplate {
      id:                      decode_uuid(&self.id)?,
      user_id:                 decode_uuid(&self.user_id)?,
      name:                    self.name,
      color:                   self.color,
      emoji:                   self.emoji,
      duration_minutes:        self.duration_minutes,
      notes:                   self.notes,
      checklist:               decode_checklist(&self.checklist)?,
      scheduled_date:          self
        .scheduled_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      is_anytime:              self.is_anytime,
      repeat_type:             decode_repeat_type(&self.repeat_type)?,
      start_time:              self.start_time,
      end_time:                self.end_time,
      reminder_at_start:       self.reminder_at_start,
      reminder_at_end:         self.reminder_at_end,
      reminder_before_minutes: self.reminder_before_minutes,
      is_completed:            self.is_completed,
      is_skipped:              self.is_skipped,
      created_at:              decode_dt(&self.created_at)?,
      updated_at:              decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawInstance::from_row`].
pub const INSTANCE_COLUMNS: &str = "id, plan_id, user_id, instance_date, \
   is_completed, is_skipped, completed_at, created_at, updated_at";

/// Raw values read directly from a `plan_instances` row.
pub struct RawInstance {
  pub id:            String,
  pub plan_id:       String,
  pub user_id:       String,
  pub instance_date: String,
  pub is_completed:  bool,
  pub is_skipped:    bool,
  pub completed_at:  Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawInstance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      plan_id:       row.get(1)?,
      user_id:       row.get(2)?,
      instance_date: row.get(3)?,
      is_completed:  row.get(4)?,
      is_skipped:    row.get(5)?,
      completed_at:  row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
    })
  }

  pub fn into_instance(self) -> Result<PlanInstance> {
    Ok(PlanInstance {
      id:            decode_uuid(&self.id)?,
      plan_id:       decode_uuid(&self.plan_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      instance_date: decode_date(&self.instance_date)?,
      is_completed:  self.is_completed,
      is_skipped:    self.is_skipped,
      completed_at:  self.completed_at.as_deref().map(decode_dt).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `push_tokens` row.
pub struct RawPushAddress {
  pub address:    String,
  pub user_id:    String,
  pub created_at: String,
}

impl RawPushAddress {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      address:    row.get(0)?,
      user_id:    row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_push_address(self) -> Result<PushAddress> {
    Ok(PushAddress {
      user_id:    decode_uuid(&self.user_id)?,
      address:    self.address,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
