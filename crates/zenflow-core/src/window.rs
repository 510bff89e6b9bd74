//! Wall-clock parsing and reminder time windows.
//!
//! Plan times are stored as display strings (`"6:00 PM"`) and interpreted
//! against a calendar date at evaluation time. All dates and instants use
//! the server reference clock (UTC).

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::PlanTemplate;

/// Default half-width of the window around a trigger instant.
pub const DEFAULT_TOLERANCE: TimeDelta = TimeDelta::seconds(60);

/// Accepted wall-clock formats, tried in order.
const WALL_CLOCK_FORMATS: &[&str] = &["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"];

/// Parse a stored wall-clock string. Returns `None` for anything that is not
/// a time of day.
pub fn parse_wall_clock(s: &str) -> Option<NaiveTime> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  WALL_CLOCK_FORMATS
    .iter()
    .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Combine `date` with a stored wall-clock string into a UTC instant.
pub fn anchor(date: NaiveDate, wall_clock: &str) -> Option<DateTime<Utc>> {
  parse_wall_clock(wall_clock).map(|t| date.and_time(t).and_utc())
}

/// The calendar date of `now` in the reference time zone.
pub fn today(now: DateTime<Utc>) -> NaiveDate { now.date_naive() }

/// Whether `now` lies within `tolerance` of `at`, bounds inclusive.
pub fn within(now: DateTime<Utc>, at: DateTime<Utc>, tolerance: TimeDelta) -> bool {
  (now - at).abs() <= tolerance
}

// ─── Candidates ──────────────────────────────────────────────────────────────

/// The plan-specific reminder kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
  PlanStart,
  PlanEnd,
  PlanBefore,
}

/// A potential trigger for one plan on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
  pub plan_id: Uuid,
  pub kind:    ReminderKind,
  pub at:      DateTime<Utc>,
}

/// All enabled trigger instants of `plan` on `date`.
///
/// Unparsable times contribute nothing. A pre-start reminder needs both a
/// positive `reminder_before_minutes` and a parsable `start_time`; it is
/// emitted even when `reminder_at_start` is off.
pub fn candidates(plan: &PlanTemplate, date: NaiveDate) -> Vec<Candidate> {
  let start = plan.start_time.as_deref().and_then(|s| anchor(date, s));
  let end = plan.end_time.as_deref().and_then(|s| anchor(date, s));

  let mut out = Vec::with_capacity(3);
  let mut push = |kind, at| out.push(Candidate { plan_id: plan.id, kind, at });

  if plan.reminder_at_start
    && let Some(at) = start
  {
    push(ReminderKind::PlanStart, at);
  }
  if plan.reminder_at_end
    && let Some(at) = end
  {
    push(ReminderKind::PlanEnd, at);
  }
  if plan.reminder_before_minutes > 0
    && let Some(at) = start
  {
    let lead = TimeDelta::minutes(i64::from(plan.reminder_before_minutes));
    push(ReminderKind::PlanBefore, at - lead);
  }
  out
}

/// The candidates of `plan` for `today(now)` whose instant is within
/// `tolerance` of `now`.
pub fn due(plan: &PlanTemplate, now: DateTime<Utc>, tolerance: TimeDelta) -> Vec<Candidate> {
  candidates(plan, today(now))
    .into_iter()
    .filter(|c| within(now, c.at, tolerance))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::plan::{NewPlan, RepeatType};

  fn plan(start: Option<&str>, end: Option<&str>) -> PlanTemplate {
    let input = NewPlan::new(Uuid::new_v4(), "Evening walk");
    let now = Utc::now();
    PlanTemplate {
      id:                      Uuid::new_v4(),
      user_id:                 input.user_id,
      name:                    input.name,
      color:                   input.color,
      emoji:                   input.emoji,
      duration_minutes:        input.duration_minutes,
      notes:                   input.notes,
      checklist:               input.checklist,
      scheduled_date:          None,
      is_anytime:              false,
      repeat_type:             RepeatType::Daily,
      start_time:              start.map(str::to_owned),
      end_time:                end.map(str::to_owned),
      reminder_at_start:       true,
      reminder_at_end:         true,
      reminder_before_minutes: 0,
      is_completed:            false,
      is_skipped:              false,
      created_at:              now,
      updated_at:              now,
    }
  }

  fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
  }

  #[test]
  fn parses_display_and_24h_formats() {
    let six_pm = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
    assert_eq!(parse_wall_clock("6:00 PM"), Some(six_pm));
    assert_eq!(parse_wall_clock("06:00 pm"), Some(six_pm));
    assert_eq!(parse_wall_clock("6:00PM"), Some(six_pm));
    assert_eq!(parse_wall_clock("18:00"), Some(six_pm));
    assert_eq!(parse_wall_clock(" 18:00:00 "), Some(six_pm));
    assert_eq!(
      parse_wall_clock("12:15 AM"),
      NaiveTime::from_hms_opt(0, 15, 0)
    );
  }

  #[test]
  fn rejects_non_times() {
    assert_eq!(parse_wall_clock("tomorrow"), None);
    assert_eq!(parse_wall_clock(""), None);
    assert_eq!(parse_wall_clock("25:00"), None);
    assert_eq!(parse_wall_clock("13:00 PM"), None);
  }

  #[test]
  fn window_boundary_is_sixty_seconds() {
    let target = at(18, 0, 0);
    assert!(within(target, target, DEFAULT_TOLERANCE));
    assert!(within(at(18, 1, 0), target, DEFAULT_TOLERANCE));
    assert!(within(at(17, 59, 0), target, DEFAULT_TOLERANCE));
    assert!(!within(at(18, 1, 1), target, DEFAULT_TOLERANCE));
    assert!(!within(at(17, 58, 59), target, DEFAULT_TOLERANCE));
  }

  #[test]
  fn start_reminder_due_at_start_time() {
    let p = plan(Some("6:00 PM"), None);
    let due = due(&p, at(18, 0, 30), DEFAULT_TOLERANCE);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].kind, ReminderKind::PlanStart);
    assert_eq!(due[0].at, at(18, 0, 0));
  }

  #[test]
  fn before_reminder_requires_positive_minutes() {
    let mut p = plan(Some("6:00 PM"), Some("6:30 PM"));
    p.reminder_at_start = false;
    p.reminder_at_end = false;
    assert!(candidates(&p, at(0, 0, 0).date_naive()).is_empty());

    p.reminder_before_minutes = 15;
    let c = candidates(&p, at(0, 0, 0).date_naive());
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].kind, ReminderKind::PlanBefore);
    assert_eq!(c[0].at, at(17, 45, 0));
  }

  #[test]
  fn malformed_time_yields_no_candidate() {
    let mut p = plan(Some("tomorrow"), Some("7:00 PM"));
    p.reminder_before_minutes = 5;
    let c = candidates(&p, at(0, 0, 0).date_naive());
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].kind, ReminderKind::PlanEnd);
  }

  #[test]
  fn disabled_flags_suppress_candidates() {
    let mut p = plan(Some("6:00 PM"), Some("7:00 PM"));
    p.reminder_at_start = false;
    let c = candidates(&p, at(0, 0, 0).date_naive());
    assert_eq!(c.iter().map(|c| c.kind).collect::<Vec<_>>(), vec![
      ReminderKind::PlanEnd
    ]);
  }
}
