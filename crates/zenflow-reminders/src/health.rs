//! `GET /api/health`: liveness plus per-job counters.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::scheduler::{JobBoard, JobStatus};

#[derive(Debug, Serialize)]
pub struct HealthReport {
  pub status:  &'static str,
  pub message: &'static str,
  pub version: &'static str,
  pub jobs:    Vec<JobStatus>,
}

pub fn router(board: JobBoard) -> Router {
  Router::new()
    .route("/api/health", get(health))
    .layer(TraceLayer::new_for_http())
    .with_state(board)
}

async fn health(State(board): State<JobBoard>) -> Json<HealthReport> {
  Json(HealthReport {
    status:  "healthy",
    message: "ZenFlow reminders are running",
    version: env!("CARGO_PKG_VERSION"),
    jobs:    board.snapshot(),
  })
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use chrono::{DateTime, Utc};
  use tower::ServiceExt as _;

  use super::*;
  use crate::scheduler::{Job, Schedule, Scheduler};

  struct Noop;

  impl Job for Noop {
    fn name(&self) -> &'static str { "noop" }

    async fn run(&self, _now: DateTime<Utc>) {}
  }

  async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
  }

  #[tokio::test]
  async fn reports_healthy_with_job_counters() {
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Arc::new(Noop), Schedule::Every(Duration::from_secs(60)));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (status, body) = get_json(router(scheduler.board()), "/api/health").await;
    scheduler.shutdown().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["jobs"][0]["name"], "noop");
    assert_eq!(body["jobs"][0]["started"], 1);
  }

  #[tokio::test]
  async fn unknown_path_is_404() {
    let (status, _) = get_json(router(JobBoard::default()), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
