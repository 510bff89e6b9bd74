//! Expo push delivery for ZenFlow notifications.
//!
//! [`ExpoDispatcher`] implements [`zenflow_core::notification::Dispatcher`]
//! by posting JSON batches to the Expo push HTTP API.

pub mod error;
pub mod expo;

pub use error::{Error, Result};
pub use expo::{DEFAULT_ENDPOINT, ExpoConfig, ExpoDispatcher, MAX_CHUNK, is_push_address};
