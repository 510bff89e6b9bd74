use thiserror::Error;

/// Setup errors. Delivery failures are reported per message as
/// [`zenflow_core::notification::DispatchError`] instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("invalid push endpoint {0:?}")]
  Endpoint(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
