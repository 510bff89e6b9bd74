//! Recurrence evaluation: does a plan have an occurrence on a given date?
//!
//! The anchor is the template's `scheduled_date`. Patterns that need a
//! weekday or day-of-month (`weekly`, `biweekly`, `monthly`) take it from
//! the anchor and never occur before it.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::plan::RepeatType;

impl RepeatType {
  /// Whether a plan with this repeat type and `anchor` occurs on `date`.
  ///
  /// `custom` carries no rule data, so it only matches the anchor itself.
  pub fn occurs_on(self, anchor: Option<NaiveDate>, date: NaiveDate) -> bool {
    if let Some(a) = anchor
      && date < a
    {
      return false;
    }

    match self {
      Self::Once | Self::Custom => anchor == Some(date),
      Self::Daily => true,
      Self::Weekdays => !is_weekend(date.weekday()),
      Self::Weekends => is_weekend(date.weekday()),
      Self::Weekly => {
        anchor.is_some_and(|a| a.weekday() == date.weekday())
      }
      Self::Biweekly => anchor.is_some_and(|a| {
        let days = (date - a).num_days();
        days % 14 == 0
      }),
      Self::Monthly => anchor.is_some_and(|a| {
        date.day() == a.day().min(last_day_of_month(date))
      }),
    }
  }
}

fn is_weekend(day: Weekday) -> bool { matches!(day, Weekday::Sat | Weekday::Sun) }

/// Day number of the last day in `date`'s month.
fn last_day_of_month(date: NaiveDate) -> u32 {
  let (y, m) = if date.month() == 12 {
    (date.year() + 1, 1)
  } else {
    (date.year(), date.month() + 1)
  };
  NaiveDate::from_ymd_opt(y, m, 1)
    .and_then(|first| first.pred_opt())
    .map_or(28, |last| last.day())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn once_matches_only_its_date() {
    let anchor = Some(d(2025, 3, 10));
    assert!(RepeatType::Once.occurs_on(anchor, d(2025, 3, 10)));
    assert!(!RepeatType::Once.occurs_on(anchor, d(2025, 3, 11)));
    assert!(!RepeatType::Once.occurs_on(None, d(2025, 3, 10)));
  }

  #[test]
  fn nothing_occurs_before_the_anchor() {
    let anchor = Some(d(2025, 3, 10));
    assert!(!RepeatType::Daily.occurs_on(anchor, d(2025, 3, 9)));
    assert!(RepeatType::Daily.occurs_on(anchor, d(2025, 3, 10)));
    assert!(RepeatType::Daily.occurs_on(None, d(1999, 1, 1)));
  }

  #[test]
  fn weekdays_and_weekends() {
    // 2025-03-15 is a Saturday.
    let sat = d(2025, 3, 15);
    let mon = d(2025, 3, 17);
    assert!(RepeatType::Weekends.occurs_on(None, sat));
    assert!(!RepeatType::Weekends.occurs_on(None, mon));
    assert!(RepeatType::Weekdays.occurs_on(None, mon));
    assert!(!RepeatType::Weekdays.occurs_on(None, sat));
  }

  #[test]
  fn weekly_and_biweekly_follow_anchor_weekday() {
    let anchor = Some(d(2025, 3, 3)); // Monday
    assert!(RepeatType::Weekly.occurs_on(anchor, d(2025, 3, 10)));
    assert!(!RepeatType::Weekly.occurs_on(anchor, d(2025, 3, 11)));
    assert!(!RepeatType::Weekly.occurs_on(None, d(2025, 3, 10)));

    assert!(RepeatType::Biweekly.occurs_on(anchor, d(2025, 3, 3)));
    assert!(!RepeatType::Biweekly.occurs_on(anchor, d(2025, 3, 10)));
    assert!(RepeatType::Biweekly.occurs_on(anchor, d(2025, 3, 17)));
  }

  #[test]
  fn monthly_clamps_to_month_end() {
    let anchor = Some(d(2025, 1, 31));
    assert!(RepeatType::Monthly.occurs_on(anchor, d(2025, 2, 28)));
    assert!(!RepeatType::Monthly.occurs_on(anchor, d(2025, 2, 27)));
    assert!(RepeatType::Monthly.occurs_on(anchor, d(2025, 4, 30)));
    assert!(RepeatType::Monthly.occurs_on(anchor, d(2025, 5, 31)));
    assert!(!RepeatType::Monthly.occurs_on(anchor, d(2025, 5, 30)));
    // Leap year.
    assert!(RepeatType::Monthly.occurs_on(anchor, d(2028, 2, 29)));
  }

  #[test]
  fn custom_only_matches_anchor() {
    let anchor = Some(d(2025, 6, 1));
    assert!(RepeatType::Custom.occurs_on(anchor, d(2025, 6, 1)));
    assert!(!RepeatType::Custom.occurs_on(anchor, d(2025, 6, 2)));
  }
}
