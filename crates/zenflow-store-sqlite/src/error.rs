//! Errors raised by [`crate::SqliteStore`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored value violates a domain rule, e.g. an unknown repeat type.
  #[error("invalid plan row: {0}")]
  Core(#[from] zenflow_core::Error),

  #[error("sqlite: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The `checklist` column holds malformed JSON.
  #[error("checklist column: {0}")]
  Json(#[from] serde_json::Error),

  #[error("malformed id column: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("malformed date column: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
