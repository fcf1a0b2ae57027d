//! Nutshell CLI
//!
//! Command-line interface over the local record store:
//! - Import records (CSV, Apple Health export)
//! - List and search events
//! - Render a graph frame as JSON
//! - Find orphaned meal photos
//! - Write a default config file

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nutshell::api::routes::graph::parse_time_param;
use nutshell::config::Config;
use nutshell::events::photos::{delete_orphans, find_orphans_in_store};
use nutshell::events::{EventListState, NutEvent};
use nutshell::graph::{GraphRenderer, TimeWindow};
use nutshell::import::{AppleHealthImporter, CsvRecordImporter};
use nutshell::store::{open_store, ClinicalRecord, RecordStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nutshell")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diabetes logbook: events, graph and imports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/nutshell/config.toml or ./nutshell.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// User whose records are read and written (default: from config)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import records into the store
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// List events, most recent first
    Events {
        /// Show at most this many events
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search events by title, notes or location
    Search {
        /// Case-insensitive substring
        query: String,
    },

    /// Render the graph model for a time window as JSON
    Graph {
        /// Window start: ms timestamp, RFC 3339, "now-6h" (default: window ending now)
        #[arg(short, long)]
        start: Option<String>,
        /// Window length in hours
        #[arg(long)]
        hours: Option<f64>,
        /// Width in pixels
        #[arg(long)]
        width: Option<f64>,
        /// Height in pixels
        #[arg(long)]
        height: Option<f64>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Meal photo maintenance
    Photos {
        #[command(subcommand)]
        action: PhotoAction,
    },

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ImportSource {
    /// Import a CSV file with a header row
    Csv {
        path: PathBuf,
        /// Timestamp format (strftime) tried before RFC 3339
        #[arg(long)]
        timestamp_format: Option<String>,
        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
        /// Parse only, don't write to the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Import blood glucose from an Apple Health export (.zip or export.xml)
    AppleHealth {
        path: PathBuf,
        /// Parse only, don't write to the store
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum PhotoAction {
    /// List local photos no meal references
    Orphans {
        /// Photo directory (default: from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Delete the orphans
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default config file
    Init {
        /// Output path (default: ~/.config/nutshell/config.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Print to stdout instead of writing
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Commands::Config { action } = &cli.command {
        return run_config(action);
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    let user_id = cli.user.clone().unwrap_or_else(|| config.events.user_id.clone());
    let store = open_store(&config.store.backend, Path::new(&config.store.data_dir))
        .context("opening record store")?;

    match cli.command {
        Commands::Import { source } => run_import(source, store.as_ref(), &user_id).await?,

        Commands::Events { limit } => {
            let state = EventListState::new(store, user_id, config.events.bucket_minutes);
            state.rebuild().await;
            let mut events = state.events().await;
            if let Some(limit) = limit {
                events.truncate(limit);
            }
            print_events(&events, &cli.format)?;
        }

        Commands::Search { query } => {
            let state = EventListState::new(store, user_id, config.events.bucket_minutes);
            state.rebuild().await;
            let events = state.apply_filter(&query).await;
            if events.is_empty() && cli.format != "json" {
                println!("No events match {:?}", query);
            } else {
                print_events(&events, &cli.format)?;
            }
        }

        Commands::Graph {
            start,
            hours,
            width,
            height,
            output,
        } => {
            let hours = hours.unwrap_or(config.graph.window_hours);
            let width = width.unwrap_or(config.graph.width_px);
            let height = height.unwrap_or(config.graph.height_px);
            if hours <= 0.0 || width <= 0.0 || height <= 0.0 {
                bail!("hours, width and height must be positive");
            }

            let window = match start.as_deref() {
                Some(start) => TimeWindow::new(parse_time_param(start)?, hours * 3600.0, width),
                None => TimeWindow::ending_at(Utc::now(), hours, width),
            };

            let renderer = GraphRenderer::new(config.graph.clone());
            let frame = renderer
                .render_from_store(store.as_ref(), &user_id, window, height)
                .await;
            let json = serde_json::to_string_pretty(&frame)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!(
                        "Graph with {} primitives written to {:?}",
                        frame.primitive_count(),
                        path
                    );
                }
                None => println!("{}", json),
            }
        }

        Commands::Photos {
            action: PhotoAction::Orphans { dir, delete },
        } => {
            let dir = dir.unwrap_or_else(|| config.store.photo_dir());
            let orphans = find_orphans_in_store(
                store.as_ref(),
                &user_id,
                config.events.bucket_minutes,
                &dir,
            )
            .await
            .with_context(|| format!("checking photos in {}", dir.display()))?;

            if orphans.is_empty() {
                println!("No orphaned photos in {:?}", dir);
            } else {
                println!("Orphaned photos in {:?}:", dir);
                for name in &orphans {
                    println!("  {}", name);
                }
                if delete {
                    let removed = delete_orphans(&dir, &orphans);
                    println!("Deleted {} of {}", removed, orphans.len());
                }
            }
        }

        Commands::Config { action } => run_config(&action)?,
    }

    Ok(())
}

/// Diagnostics go to stderr so JSON output stays clean
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nutshell=warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_import(
    source: ImportSource,
    store: &dyn RecordStore,
    user_id: &str,
) -> anyhow::Result<()> {
    let (records, dry_run): (Vec<ClinicalRecord>, bool) = match source {
        ImportSource::Csv {
            path,
            timestamp_format,
            delimiter,
            dry_run,
        } => {
            if !delimiter.is_ascii() {
                bail!("delimiter must be a single ASCII character");
            }
            let mut importer = CsvRecordImporter::new(user_id).with_delimiter(delimiter as u8);
            if let Some(format) = &timestamp_format {
                importer = importer.with_timestamp_format(format);
            }
            let result = importer
                .import(&path)
                .with_context(|| format!("importing {}", path.display()))?;

            println!("Import results:");
            println!("  Rows processed: {}", result.rows_processed);
            println!("  Rows failed: {}", result.rows_failed);
            println!("  Records: {}", result.records.len());
            if !result.errors.is_empty() {
                println!();
                println!("Errors (first 10):");
                for error in result.errors.iter().take(10) {
                    println!("  {}", error);
                }
            }
            (result.records, dry_run)
        }

        ImportSource::AppleHealth { path, dry_run } => {
            let records = AppleHealthImporter::new(user_id)
                .import_path(&path)
                .with_context(|| format!("importing {}", path.display()))?;
            println!("Glucose samples: {}", records.len());
            (records, dry_run)
        }
    };

    if dry_run {
        println!();
        println!("(Dry run - nothing was written)");
    } else if !records.is_empty() {
        let written = store.insert(&records).await.context("writing records")?;
        println!("Stored {} records", written);
    }
    Ok(())
}

fn print_events(events: &[(String, NutEvent)], format: &str) -> anyhow::Result<()> {
    if format == "json" {
        let list: Vec<&NutEvent> = events.iter().map(|(_, e)| e).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events yet.");
        println!();
        println!("Import records with:");
        println!("  nutshell-cli import csv <path>");
        return Ok(());
    }

    println!(
        "{:<17} {:<8} {:<24} {:<16} {:>5} {:>7}",
        "When", "Kind", "Title", "Location", "Items", "Carbs"
    );
    println!("{}", "-".repeat(82));

    for (_, event) in events {
        let when = chrono::DateTime::from_timestamp_millis(event.most_recent())
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let kind = serde_json::to_value(event.kind())?
            .as_str()
            .unwrap_or("-")
            .to_string();
        println!(
            "{:<17} {:<8} {:<24} {:<16} {:>5} {:>7}",
            when,
            kind,
            truncate(event.title(), 24),
            truncate(event.location(), 16),
            event.item_count(),
            format!("{:.0}g", event.total_carbs())
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

fn run_config(action: &ConfigAction) -> anyhow::Result<()> {
    let ConfigAction::Init {
        output,
        force,
        stdout,
    } = action;
    let content = nutshell::config::generate_default_config();

    if *stdout {
        print!("{}", content);
        return Ok(());
    }

    let path = output.clone().unwrap_or_else(Config::default_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &content).with_context(|| format!("writing {}", path.display()))?;
    println!("Config written to {:?}", path);
    Ok(())
}
