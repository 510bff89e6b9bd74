//! Periodic engagement nudges to a random sample of registered devices.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use zenflow_core::{
  notification::{Dispatcher, NotificationMessage, Outcome},
  store::PlanStore,
};

use crate::{ScanError, scheduler::Job};

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

pub const TITLES: [&str; 5] = [
  "Keep your streak alive 🔥",
  "Quick win time ✨",
  "2 minutes for future you ⏳",
  "ZenFlow check-in 🧘",
  "Tiny step, big impact 🚀",
];

pub const BODIES: [&str; 5] = [
  "Open ZenFlow and plan your next move.",
  "A 2-minute action beats perfect plans.",
  "What’s one small task you can do now?",
  "Momentum loves consistency.",
  "Show up for yourself today.",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NudgeReport {
  /// Distinct registered addresses.
  pub addresses: usize,
  pub messages:  usize,
  pub delivered: usize,
  pub failed:    usize,
}

pub struct NudgeJob<S, D> {
  store:       Arc<S>,
  dispatcher:  Arc<D>,
  sample_size: usize,
}

impl<S: PlanStore, D: Dispatcher> NudgeJob<S, D> {
  pub fn new(store: Arc<S>, dispatcher: Arc<D>, sample_size: usize) -> Self {
    Self { store, dispatcher, sample_size }
  }

  /// Send one nudge to each of up to `sample_size` distinct addresses,
  /// chosen uniformly at random.
  pub async fn tick(&self) -> Result<NudgeReport, ScanError> {
    let mut addresses = self
      .store
      .all_push_addresses()
      .await
      .map_err(ScanError::store)?;
    addresses.sort();
    addresses.dedup();

    let batch: Vec<NotificationMessage> = {
      let mut rng = rand::thread_rng();
      let picked: Vec<&String> = addresses
        .choose_multiple(&mut rng, self.sample_size)
        .collect();
      picked
        .into_iter()
        .map(|to| {
          let title = TITLES[rng.gen_range(0..TITLES.len())];
          let body = BODIES[rng.gen_range(0..BODIES.len())];
          NotificationMessage::nudge(to, title, body)
        })
        .collect()
    };

    let mut report = NudgeReport {
      addresses: addresses.len(),
      messages: batch.len(),
      ..Default::default()
    };
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
          tracing::warn!(%to, error = %e, "nudge not delivered");
        }
      }
    }
    Ok(report)
  }
}

impl<S, D> Job for NudgeJob<S, D>
where
  S: PlanStore + 'static,
  D: Dispatcher + 'static,
{
  fn name(&self) -> &'static str { "nudge" }

  async fn run(&self, _now: DateTime<Utc>) {
    match self.tick().await {
      Ok(report) => tracing::info!(?report, "nudges sent"),
      Err(e) => tracing::warn!(error = %e, "nudge tick aborted"),
    }
  }
}
