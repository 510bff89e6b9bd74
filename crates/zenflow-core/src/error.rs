//! Error types for `zenflow-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The template is absent or not owned by the requesting user.
  #[error("plan not found: {0}")]
  PlanNotFound(Uuid),

  /// The instance row vanished between lookup and update.
  #[error("no instance of plan {plan_id} on {date}")]
  InstanceNotFound { plan_id: Uuid, date: NaiveDate },

  /// The requested state transition is not allowed.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("unknown repeat type: {0:?}")]
  UnknownRepeatType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
