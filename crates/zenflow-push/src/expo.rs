//! Async HTTP client for the Expo push API.

use std::time::Duration;

use reqwest::{Client, header};
use serde::Deserialize;
use zenflow_core::notification::{
  DispatchError, Dispatcher, NotificationMessage, Outcome,
};

use crate::{Error, Result};

/// The public Expo push endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Expo accepts at most this many messages per request.
pub const MAX_CHUNK: usize = 100;

/// Connection settings for the Expo push API.
#[derive(Debug, Clone)]
pub struct ExpoConfig {
  pub endpoint:     String,
  /// Sent as a bearer token when push security is enabled for the project.
  pub access_token: Option<String>,
  pub timeout:      Duration,
}

impl Default for ExpoConfig {
  fn default() -> Self {
    Self {
      endpoint:     DEFAULT_ENDPOINT.to_owned(),
      access_token: None,
      timeout:      Duration::from_secs(30),
    }
  }
}

/// Whether `address` looks like an Expo push token.
pub fn is_push_address(address: &str) -> bool {
  ["ExponentPushToken[", "ExpoPushToken["].iter().any(|prefix| {
    address
      .strip_prefix(prefix)
      .and_then(|rest| rest.strip_suffix(']'))
      .is_some_and(|inner| !inner.is_empty())
  })
}

/// Delivers notification batches through Expo.
///
/// Cheap to clone, the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ExpoDispatcher {
  client: Client,
  config: ExpoConfig,
}

impl ExpoDispatcher {
  pub fn new(config: ExpoConfig) -> Result<Self> {
    if !config.endpoint.starts_with("http://")
      && !config.endpoint.starts_with("https://")
    {
      return Err(Error::Endpoint(config.endpoint));
    }
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  /// Post one chunk and map the returned tickets onto its messages.
  async fn post_chunk(&self, messages: &[&NotificationMessage]) -> Vec<Outcome> {
    let mut req = self
      .client
      .post(&self.config.endpoint)
      .header(header::ACCEPT, "application/json")
      .json(messages);
    if let Some(token) = &self.config.access_token {
      req = req.bearer_auth(token);
    }

    let resp = match req.send().await {
      Ok(resp) => resp,
      Err(e) => {
        tracing::warn!(error = %e, count = messages.len(), "push request failed");
        return fail_all(messages.len(), DispatchError::Transport(e.to_string()));
      }
    };

    let status = resp.status();
    if !status.is_success() {
      tracing::warn!(%status, count = messages.len(), "push service rejected chunk");
      return fail_all(messages.len(), DispatchError::Http(status.as_u16()));
    }

    let body: PushResponse = match resp.json().await {
      Ok(body) => body,
      Err(e) => {
        tracing::warn!(error = %e, "unreadable push response");
        return fail_all(messages.len(), DispatchError::Transport(e.to_string()));
      }
    };

    let mut tickets = body.data.into_iter();
    messages
      .iter()
      .map(|m| match tickets.next() {
        Some(ticket) => ticket.into_outcome(&m.to),
        None => Outcome::Failed(DispatchError::MissingTicket),
      })
      .collect()
  }
}

impl Dispatcher for ExpoDispatcher {
  async fn send(&self, batch: Vec<NotificationMessage>) -> Vec<Outcome> {
    let mut outcomes: Vec<Option<Outcome>> = vec![None; batch.len()];

    let mut valid = Vec::with_capacity(batch.len());
    for (i, message) in batch.iter().enumerate() {
      if is_push_address(&message.to) {
        valid.push((i, message));
      } else {
        tracing::debug!(to = %message.to, "skipping malformed push address");
        outcomes[i] =
          Some(Outcome::Failed(DispatchError::InvalidAddress(message.to.clone())));
      }
    }

    for chunk in valid.chunks(MAX_CHUNK) {
      let messages: Vec<&NotificationMessage> = chunk.iter().map(|(_, m)| *m).collect();
      let results = self.post_chunk(&messages).await;
      for ((i, _), outcome) in chunk.iter().zip(results) {
        outcomes[*i] = Some(outcome);
      }
    }

    outcomes
      .into_iter()
      .map(|o| o.unwrap_or(Outcome::Failed(DispatchError::MissingTicket)))
      .collect()
  }
}

fn fail_all(n: usize, error: DispatchError) -> Vec<Outcome> {
  vec![Outcome::Failed(error); n]
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PushResponse {
  #[serde(default)]
  data: Vec<PushTicket>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum TicketStatus {
  Ok,
  Error,
}

#[derive(Deserialize)]
struct PushTicket {
  status:  TicketStatus,
  id:      Option<String>,
  message: Option<String>,
  details: Option<TicketDetails>,
}

#[derive(Deserialize)]
struct TicketDetails {
  error: Option<String>,
}

impl PushTicket {
  fn into_outcome(self, to: &str) -> Outcome {
    match self.status {
      TicketStatus::Ok => Outcome::Delivered { ticket_id: self.id },
      TicketStatus::Error => {
        let code = self.details.and_then(|d| d.error);
        let message = self.message.unwrap_or_else(|| "unknown error".to_owned());
        tracing::debug!(%to, ?code, %message, "push ticket error");
        Outcome::Failed(DispatchError::Rejected { message, code })
      }
    }
  }
}
