//! zenflowd: the ZenFlow reminder daemon.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `ZENFLOW_*`
//! environment variables, opens the SQLite store, and runs the reminder scan
//! and nudge jobs until interrupted. A health endpoint reports job status.
//!
//! `--once` runs a single reminder scan and exits, which is handy from cron
//! or when debugging a plan's reminder times.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use zenflow_push::ExpoDispatcher;
use zenflow_reminders::{
  NudgeJob, ReminderScan, Schedule, Scheduler, ServiceConfig, health,
};
use zenflow_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "ZenFlow reminder daemon")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one reminder scan and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("ZENFLOW")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("nudge_times"),
    )
    .build()
    .context("failed to read config file")?;

  let cfg: ServiceConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServiceConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let dispatcher =
    Arc::new(ExpoDispatcher::new(cfg.expo()).context("failed to build push dispatcher")?);

  let scan = Arc::new(ReminderScan::new(
    Arc::clone(&store),
    Arc::clone(&dispatcher),
    cfg.tolerance(),
  ));

  if cli.once {
    let report = scan.tick(Utc::now()).await.context("reminder scan failed")?;
    tracing::info!(?report, "single scan finished");
    return Ok(());
  }

  let nudge = Arc::new(NudgeJob::new(store, dispatcher, cfg.nudge_sample_size));

  let mut scheduler = Scheduler::new();
  scheduler.spawn(scan, Schedule::Every(cfg.scan_interval()?));
  scheduler.spawn(nudge, Schedule::DailyAt(cfg.nudge_schedule()?));

  let app = health::router(scheduler.board());
  let listener = TcpListener::bind(&cfg.health_addr)
    .await
    .with_context(|| format!("failed to bind {}", cfg.health_addr))?;
  tracing::info!("Health endpoint on http://{}/api/health", cfg.health_addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("health server error")?;

  tracing::info!("shutting down, waiting for running jobs");
  scheduler.shutdown().await;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
