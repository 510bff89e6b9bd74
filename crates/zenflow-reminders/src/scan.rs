//! The reminder scan engine.
//!
//! Each tick loads the plans relevant to today, finds the start, end and
//! pre-start instants that fall inside the tolerance window around `now`,
//! and hands one message per (due reminder, owner address) to the
//! dispatcher in a single batch.
//!
//! With a window of ±60 s and a 60 s period two consecutive ticks can both
//! match the same instant. A ledger of already-dispatched
//! `(plan, kind, instant)` keys keeps that to one send. The ledger lives in
//! memory only, so a restart inside a window may repeat a reminder.

use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;
use zenflow_core::{
  notification::{Dispatcher, NotificationMessage, Outcome},
  store::PlanStore,
  window::{self, Candidate, DEFAULT_TOLERANCE},
};

use crate::{ScanError, scheduler::Job};

/// How long dispatched keys are remembered.
const LEDGER_RETENTION: TimeDelta = TimeDelta::days(1);

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
  pub plans_scanned: usize,
  pub messages:      usize,
  pub delivered:     usize,
  pub failed:        usize,
  /// Due reminders already dispatched by an earlier tick.
  pub suppressed:    usize,
}

pub struct ReminderScan<S, D> {
  store:      Arc<S>,
  dispatcher: Arc<D>,
  tolerance:  TimeDelta,
  ledger:     Mutex<HashSet<Candidate>>,
}

impl<S: PlanStore, D: Dispatcher> ReminderScan<S, D> {
  pub fn new(store: Arc<S>, dispatcher: Arc<D>, tolerance: TimeDelta) -> Self {
    Self { store, dispatcher, tolerance, ledger: Mutex::new(HashSet::new()) }
  }

  pub fn with_default_tolerance(store: Arc<S>, dispatcher: Arc<D>) -> Self {
    Self::new(store, dispatcher, DEFAULT_TOLERANCE)
  }

  /// Run one scan at `now`.
  ///
  /// A store failure aborts the tick before anything is sent. Delivery
  /// failures are counted and logged but never retried.
  pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, ScanError> {
    let today = window::today(now);
    let plans: Vec<_> = self
      .store
      .plans_for_scan(today)
      .await
      .map_err(ScanError::store)?
      .into_iter()
      .filter(|p| p.occurs_on(today))
      .collect();

    let mut report = TickReport { plans_scanned: plans.len(), ..Default::default() };
    if plans.is_empty() {
      return Ok(report);
    }

    let owners: Vec<Uuid> = plans
      .iter()
      .map(|p| p.user_id)
      .collect::<HashSet<_>>()
      .into_iter()
      .collect();
    let mut addresses: HashMap<Uuid, Vec<String>> = HashMap::new();
    for a in self
      .store
      .push_addresses_for(&owners)
      .await
      .map_err(ScanError::store)?
    {
      let list = addresses.entry(a.user_id).or_default();
      if !list.contains(&a.address) {
        list.push(a.address);
      }
    }

    let mut batch = Vec::new();
    {
      let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
      ledger.retain(|c| now - c.at <= LEDGER_RETENTION);

      for plan in &plans {
        for candidate in window::due(plan, now, self.tolerance) {
          if !ledger.insert(candidate) {
            report.suppressed += 1;
            continue;
          }
          let targets = addresses.get(&plan.user_id).map(Vec::as_slice).unwrap_or_default();
          tracing::debug!(
            plan_id = %plan.id,
            kind = ?candidate.kind,
            at = %candidate.at,
            recipients = targets.len(),
            "reminder due"
          );
          batch.extend(
            targets
              .iter()
              .map(|to| NotificationMessage::for_plan(to, candidate.kind, plan)),
          );
        }
      }
    }

    report.messages = batch.len();
    if batch.is_empty() {
      return Ok(report);
    }

    let recipients: Vec<String> = batch.iter().map(|m| m.to.clone()).collect();
    let outcomes = self.dispatcher.send(batch).await;
    for (to, outcome) in recipients.iter().zip(&outcomes) {
      match outcome {
        Outcome::Delivered { .. } => report.delivered += 1,
        Outcome::Failed(e) => {
          report.failed += 1;
          tracing::warn!(%to, error = %e, "reminder not delivered");
        }
      }
    }
    Ok(report)
  }
}

impl<S, D> Job for ReminderScan<S, D>
where
  S: PlanStore + 'static,
  D: Dispatcher + 'static,
{
  fn name(&self) -> &'static str { "reminder-scan" }

  async fn run(&self, now: DateTime<Utc>) {
    match self.tick(now).await {
      Ok(report) if report.messages > 0 || report.suppressed > 0 => {
        tracing::info!(?report, "reminder scan finished");
      }
      Ok(report) => tracing::debug!(?report, "reminder scan finished"),
      Err(e) => tracing::warn!(error = %e, "reminder scan aborted"),
    }
  }
}
