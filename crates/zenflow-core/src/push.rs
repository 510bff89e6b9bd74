//! Registered push addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An Expo-style push address registered by one of a user's devices.
/// A user may have any number of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAddress {
  pub user_id:    Uuid,
  pub address:    String,
  pub created_at: DateTime<Utc>,
}
