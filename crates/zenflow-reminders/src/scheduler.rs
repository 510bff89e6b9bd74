//! Periodic job runner.
//!
//! Every registered job gets its own loop task. Each firing spawns the job's
//! tick as a separate task so a slow tick never shifts the cadence; a firing
//! that finds the previous tick of the same job still running is skipped.

use std::{
  future::Future,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{Interval, MissedTickBehavior},
};

/// A unit of periodic work.
pub trait Job: Send + Sync + 'static {
  fn name(&self) -> &'static str;

  /// Run one tick. Failures are handled (logged) by the job itself.
  fn run(&self, now: DateTime<Utc>) -> impl Future<Output = ()> + Send + '_;
}

/// When a job fires.
#[derive(Debug, Clone)]
pub enum Schedule {
  /// Fixed period, first firing immediately.
  Every(Duration),
  /// Once a day at each of the given UTC times.
  DailyAt(Vec<NaiveTime>),
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Counters for one job, exposed on the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStatus {
  pub name:          &'static str,
  pub started:       u64,
  pub finished:      u64,
  pub skipped:       u64,
  pub last_started:  Option<DateTime<Utc>>,
  pub last_finished: Option<DateTime<Utc>>,
}

type SharedStatus = Arc<Mutex<JobStatus>>;

fn update(status: &SharedStatus, f: impl FnOnce(&mut JobStatus)) {
  f(&mut status.lock().unwrap_or_else(PoisonError::into_inner));
}

/// Read-only view of the status of every scheduled job.
#[derive(Clone, Default)]
pub struct JobBoard {
  jobs: Vec<SharedStatus>,
}

impl JobBoard {
  pub fn snapshot(&self) -> Vec<JobStatus> {
    self
      .jobs
      .iter()
      .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).clone())
      .collect()
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

pub struct Scheduler {
  board:   JobBoard,
  handles: Vec<JoinHandle<()>>,
  stop:    watch::Sender<bool>,
}

impl Scheduler {
  pub fn new() -> Self {
    let (stop, _) = watch::channel(false);
    Self { board: JobBoard::default(), handles: Vec::new(), stop }
  }

  /// Start running `job` on `schedule`. Must be called inside a Tokio
  /// runtime.
  pub fn spawn<J: Job>(&mut self, job: Arc<J>, schedule: Schedule) {
    let status = Arc::new(Mutex::new(JobStatus {
      name: job.name(),
      ..Default::default()
    }));
    self.board.jobs.push(Arc::clone(&status));

    tracing::info!(job = job.name(), ?schedule, "scheduling job");
    let stop = self.stop.subscribe();
    self
      .handles
      .push(tokio::spawn(drive(job, Timer::new(schedule), status, stop)));
  }

  pub fn board(&self) -> JobBoard { self.board.clone() }

  /// Stop every job loop and wait for in-flight ticks to finish.
  pub async fn shutdown(self) {
    // Receivers also stop when the sender is dropped, so a send error is moot.
    let _ = self.stop.send(true);
    for handle in self.handles {
      if let Err(e) = handle.await {
        tracing::error!(error = %e, "job loop panicked");
      }
    }
  }
}

impl Default for Scheduler {
  fn default() -> Self { Self::new() }
}

async fn drive<J: Job>(
  job: Arc<J>,
  mut timer: Timer,
  status: SharedStatus,
  mut stop: watch::Receiver<bool>,
) {
  let mut in_flight: Option<JoinHandle<()>> = None;

  loop {
    tokio::select! {
      _ = timer.wait() => {}
      _ = stop.changed() => break,
    }

    if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
      tracing::warn!(job = job.name(), "previous tick still running, skipping");
      update(&status, |s| s.skipped += 1);
      continue;
    }

    let now = Utc::now();
    update(&status, |s| {
      s.started += 1;
      s.last_started = Some(now);
    });

    let job = Arc::clone(&job);
    let status = Arc::clone(&status);
    in_flight = Some(tokio::spawn(async move {
      job.run(now).await;
      update(&status, |s| {
        s.finished += 1;
        s.last_finished = Some(Utc::now());
      });
    }));
  }

  if let Some(handle) = in_flight
    && let Err(e) = handle.await
  {
    tracing::error!(job = job.name(), error = %e, "tick panicked");
  }
}

// ─── Timers ──────────────────────────────────────────────────────────────────

enum Timer {
  Every(Interval),
  DailyAt {
    times: Vec<NaiveTime>,
    /// Slot of the previous firing; the sleep can end before the wall clock
    /// reaches it.
    last:  Option<DateTime<Utc>>,
  },
}

impl Timer {
  fn new(schedule: Schedule) -> Self {
    match schedule {
      Schedule::Every(period) => {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self::Every(interval)
      }
      Schedule::DailyAt(mut times) => {
        times.sort();
        times.dedup();
        Self::DailyAt { times, last: None }
      }
    }
  }

  async fn wait(&mut self) {
    match self {
      Self::Every(interval) => {
        interval.tick().await;
      }
      Self::DailyAt { times, last } => {
        let now = Utc::now();
        match next_firing(times, now, *last) {
          Some(at) => {
            tokio::time::sleep((at - now).to_std().unwrap_or_default()).await;
            *last = Some(at);
          }
          None => std::future::pending().await,
        }
      }
    }
  }
}

/// The first instant strictly after `now` whose UTC time of day is in
/// `times` (sorted ascending).
pub fn next_daily(times: &[NaiveTime], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  let first = *times.first()?;
  let today = now.date_naive();
  if let Some(t) = times.iter().find(|t| today.and_time(**t).and_utc() > now) {
    return Some(today.and_time(*t).and_utc());
  }
  Some((today + TimeDelta::days(1)).and_time(first).and_utc())
}

/// Like [`next_daily`], but never at or before `last`.
pub fn next_firing(
  times: &[NaiveTime],
  now: DateTime<Utc>,
  last: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
  next_daily(times, last.map_or(now, |l| l.max(now)))
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

  use chrono::TimeZone;

  use super::*;

  struct Sleepy {
    runs:  AtomicU32,
    done:  AtomicBool,
    delay: Duration,
  }

  impl Sleepy {
    fn new(delay: Duration) -> Arc<Self> {
      Arc::new(Self { runs: AtomicU32::new(0), done: AtomicBool::new(false), delay })
    }
  }

  impl Job for Sleepy {
    fn name(&self) -> &'static str { "sleepy" }

    async fn run(&self, _now: DateTime<Utc>) {
      self.runs.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      self.done.store(true, Ordering::SeqCst);
    }
  }

  fn at(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  #[test]
  fn next_daily_picks_later_time_today() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    let next = next_daily(&[at(9, 0), at(12, 0)], now).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
  }

  #[test]
  fn next_daily_is_strictly_after_now() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let next = next_daily(&[at(9, 0), at(12, 0)], now).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());
  }

  #[test]
  fn next_daily_wraps_month_end() {
    let now = Utc.with_ymd_and_hms(2025, 2, 28, 22, 0, 0).unwrap();
    let next = next_daily(&[at(21, 0)], now).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 21, 0, 0).unwrap());
    assert!(next_daily(&[], now).is_none());
  }

  #[test]
  fn next_firing_moves_past_last_slot_when_clock_lags() {
    let times = [at(9, 0), at(12, 0)];
    let fired = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let lagging = Utc.with_ymd_and_hms(2025, 3, 10, 8, 59, 59).unwrap();

    assert_eq!(next_daily(&times, lagging), Some(fired));
    assert_eq!(
      next_firing(&times, lagging, Some(fired)),
      Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    );
    assert_eq!(next_firing(&times, lagging, None), Some(fired));
  }

  #[test]
  fn next_firing_ignores_stale_last() {
    let times = [at(9, 0), at(12, 0)];
    let last = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    assert_eq!(
      next_firing(&times, now, Some(last)),
      Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    );
  }

  #[tokio::test]
  async fn overlapping_ticks_are_skipped() {
    let job = Sleepy::new(Duration::from_millis(150));
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Arc::clone(&job), Schedule::Every(Duration::from_millis(20)));
    let board = scheduler.board();

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.shutdown().await;

    let status = &board.snapshot()[0];
    assert_eq!(status.name, "sleepy");
    assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    assert_eq!(status.started, 1);
    assert!(status.skipped >= 1, "skipped: {}", status.skipped);
  }

  #[tokio::test]
  async fn shutdown_waits_for_running_tick() {
    let job = Sleepy::new(Duration::from_millis(200));
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Arc::clone(&job), Schedule::Every(Duration::from_secs(60)));
    let board = scheduler.board();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!job.done.load(Ordering::SeqCst));
    scheduler.shutdown().await;

    assert!(job.done.load(Ordering::SeqCst));
    let status = &board.snapshot()[0];
    assert_eq!(status.finished, 1);
    assert!(status.last_finished.is_some());
  }

  #[tokio::test]
  async fn daily_job_does_not_fire_early() {
    let job = Sleepy::new(Duration::ZERO);
    let mut scheduler = Scheduler::new();
    let soon = (Utc::now() + TimeDelta::hours(1)).time();
    scheduler.spawn(Arc::clone(&job), Schedule::DailyAt(vec![soon]));

    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.shutdown().await;
    assert_eq!(job.runs.load(Ordering::SeqCst), 0);
  }
}
