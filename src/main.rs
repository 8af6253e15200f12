mod app;
mod cache;
mod config;
mod event;
mod ui;
mod users;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "userdeck")]
#[command(about = "A terminal UI for browsing users from a REST API, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/userdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the users API (overrides config and USERDECK_API_URL)
  #[arg(short, long)]
  api_url: Option<String>,
}

/// Log to a file under the data directory; stdout belongs to the TUI.
///
/// RUST_LOG controls the level (default: info). The returned guard flushes
/// buffered lines on drop and must live until exit.
fn init_tracing() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("userdeck");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "userdeck.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing()?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
