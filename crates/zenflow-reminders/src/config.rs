//! Service configuration, deserialised from `config.toml` and `ZENFLOW_*`
//! environment variables.

use std::{path::PathBuf, time::Duration};

use chrono::{NaiveTime, TimeDelta};
use serde::Deserialize;
use zenflow_push::{DEFAULT_ENDPOINT, ExpoConfig};

use crate::{ConfigError, nudge::DEFAULT_SAMPLE_SIZE};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  pub store_path:         PathBuf,
  pub expo_url:           String,
  pub expo_access_token:  Option<String>,
  pub scan_interval_secs: u64,
  /// Half-width of the reminder window around each trigger instant.
  pub tolerance_secs:     u64,
  /// UTC wall-clock times, `HH:MM`.
  pub nudge_times:        Vec<String>,
  pub nudge_sample_size:  usize,
  pub health_addr:        String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      store_path:         PathBuf::from("zenflow.db"),
      expo_url:           DEFAULT_ENDPOINT.to_owned(),
      expo_access_token:  None,
      scan_interval_secs: 60,
      tolerance_secs:     60,
      nudge_times:        ["09:00", "12:00", "15:00", "18:00", "21:00"]
        .map(String::from)
        .to_vec(),
      nudge_sample_size:  DEFAULT_SAMPLE_SIZE,
      health_addr:        "127.0.0.1:5000".to_owned(),
    }
  }
}

impl ServiceConfig {
  pub fn scan_interval(&self) -> Result<Duration, ConfigError> {
    if self.scan_interval_secs == 0 {
      return Err(ConfigError::ZeroInterval);
    }
    Ok(Duration::from_secs(self.scan_interval_secs))
  }

  pub fn tolerance(&self) -> TimeDelta {
    i64::try_from(self.tolerance_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX)
  }

  /// Parsed nudge times, sorted and deduplicated.
  pub fn nudge_schedule(&self) -> Result<Vec<NaiveTime>, ConfigError> {
    let mut times = self
      .nudge_times
      .iter()
      .map(|s| {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
          .map_err(|_| ConfigError::NudgeTime(s.clone()))
      })
      .collect::<Result<Vec<_>, _>>()?;
    times.sort();
    times.dedup();
    Ok(times)
  }

  pub fn expo(&self) -> ExpoConfig {
    ExpoConfig {
      endpoint: self.expo_url.clone(),
      access_token: self.expo_access_token.clone(),
      ..Default::default()
    }
  }
}
