//! Reminder scanning and background jobs for ZenFlow.
//!
//! [`scan::ReminderScan`] turns due plan reminders into push messages once
//! per tick; [`nudge::NudgeJob`] sends engagement nudges at fixed times.
//! Both run under a [`scheduler::Scheduler`] and report through the
//! [`health`] endpoint.

pub mod config;
pub mod error;
pub mod health;
pub mod nudge;
pub mod scan;
pub mod scheduler;

pub use config::ServiceConfig;
pub use error::{ConfigError, ScanError};
pub use nudge::{NudgeJob, NudgeReport};
pub use scan::{ReminderScan, TickReport};
pub use scheduler::{Job, JobBoard, JobStatus, Schedule, Scheduler};
