//! Nutshell API Server
//!
//! Run with: cargo run --bin nutshell
//!
//! # Configuration
//!
//! Read from `--config <path>`, otherwise `~/.config/nutshell/config.toml` or
//! `./nutshell.toml`, with `NUTSHELL_*` environment overrides on top:
//! - `NUTSHELL_DATA_DIR`: Data directory
//! - `NUTSHELL_STORE_BACKEND`: `sqlite` (default) or `memory`
//! - `NUTSHELL_API_HOST` / `NUTSHELL_API_PORT`: Bind address (default: 127.0.0.1:8086)
//! - `NUTSHELL_USER_ID`: User whose records are served
//! - `NUTSHELL_LOG_LEVEL` / `NUTSHELL_LOG_FORMAT`: `info`, `debug`, ... / `pretty` or `json`
//! - `RUST_LOG`: Full filter directive, overrides the log level

use anyhow::Context;
use clap::Parser;
use nutshell::api::{serve, AppState};
use nutshell::config::{Config, LoggingConfig};
use nutshell::store::open_store;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nutshell")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Nutshell logbook API server")]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting Nutshell API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = %config.store.backend,
        data_dir = %config.store.data_dir,
        user_id = %config.events.user_id,
        "Opening record store"
    );

    let store = open_store(&config.store.backend, Path::new(&config.store.data_dir))
        .context("opening record store")?;

    let state = AppState::new(store, &config);
    serve(state).await.context("running API server")?;

    tracing::info!("Nutshell API server stopped");
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("nutshell={},tower_http=debug", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
