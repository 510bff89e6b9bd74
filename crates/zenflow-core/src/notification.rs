//! Notification payloads and the `Dispatcher` trait.
//!
//! Messages are derived per tick and never persisted. Their serialised form
//! is the Expo push payload `{to, title, body, data}`.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;
use uuid::Uuid;

use crate::{plan::PlanTemplate, window::ReminderKind};

// ─── Kinds ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  PlanStart,
  PlanEnd,
  PlanBefore,
  Nudge,
}

impl From<ReminderKind> for NotificationKind {
  fn from(kind: ReminderKind) -> Self {
    match kind {
      ReminderKind::PlanStart => Self::PlanStart,
      ReminderKind::PlanEnd => Self::PlanEnd,
      ReminderKind::PlanBefore => Self::PlanBefore,
    }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Deep-link data carried with every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
  #[serde(rename = "type")]
  pub kind:    NotificationKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plan_id: Option<Uuid>,
}

/// An addressed payload ready for a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
  pub to:    String,
  pub title: String,
  pub body:  String,
  pub data:  NotificationData,
}

impl NotificationMessage {
  /// Build the reminder of the given kind for `plan`, addressed to `to`.
  pub fn for_plan(to: &str, kind: ReminderKind, plan: &PlanTemplate) -> Self {
    let (title, body) = match kind {
      ReminderKind::PlanStart => (
        format!("It’s time: {}", plan.name),
        "Tap to start your session.".to_owned(),
      ),
      ReminderKind::PlanEnd => (
        format!("Wrap up: {}", plan.name),
        "How did it go? Mark complete.".to_owned(),
      ),
      ReminderKind::PlanBefore => (
        format!("Starting soon: {}", plan.name),
        format!("Begins in {} minutes.", plan.reminder_before_minutes),
      ),
    };
    Self {
      to: to.to_owned(),
      title,
      body,
      data: NotificationData { kind: kind.into(), plan_id: Some(plan.id) },
    }
  }

  pub fn nudge(to: &str, title: &str, body: &str) -> Self {
    Self {
      to:    to.to_owned(),
      title: title.to_owned(),
      body:  body.to_owned(),
      data:  NotificationData { kind: NotificationKind::Nudge, plan_id: None },
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Why a single message was not delivered. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("push service responded with HTTP {0}")]
  Http(u16),

  #[error("rejected by push service: {message}")]
  Rejected {
    message: String,
    /// Service-specific error code, e.g. `DeviceNotRegistered`.
    code:    Option<String>,
  },

  #[error("not a push address: {0:?}")]
  InvalidAddress(String),

  #[error("push service returned no ticket for this message")]
  MissingTicket,
}

/// Per-message result of [`Dispatcher::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Delivered { ticket_id: Option<String> },
  Failed(DispatchError),
}

impl Outcome {
  pub fn is_delivered(&self) -> bool { matches!(self, Self::Delivered { .. }) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Best-effort delivery of notification batches.
///
/// Implementations return exactly one [`Outcome`] per input message, in
/// input order. A failure for one message must not prevent delivery of the
/// others.
pub trait Dispatcher: Send + Sync {
  fn send(
    &self,
    batch: Vec<NotificationMessage>,
  ) -> impl Future<Output = Vec<Outcome>> + Send + '_;
}
