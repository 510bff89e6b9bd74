use thiserror::Error;

/// A failure that aborts a scan or nudge tick before anything is dispatched.
#[derive(Debug, Error)]
pub enum ScanError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ScanError {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid nudge time {0:?}, expected HH:MM")]
  NudgeTime(String),

  #[error("scan_interval_secs must be positive")]
  ZeroInterval,
}
