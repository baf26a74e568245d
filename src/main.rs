// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ironman-Tracker sync server and CLI
//!
//! `serve` runs the HTTP API; `sync` and `map-sync` run a single pass and
//! exit, for scheduled jobs.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ironman_tracker::{
    config::Config,
    db::{DocumentStore, FirestoreDb},
    services::{CacheBackend, IntervalsClient, JsonFileBackend, SyncEngine, SyncSettings},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ironman-tracker")]
#[command(about = "Sync Intervals.icu training data into the tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server (default)
    Serve,
    /// Run one full sync pass and exit
    Sync {
        /// Sync activities from this date (YYYY-MM-DD) instead of the configured start
        #[arg(long, value_name = "DATE")]
        oldest: Option<NaiveDate>,
    },
    /// Fetch any missing routes for stored activities and republish the map
    MapSync,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let cli = Cli::parse();

    // Load configuration from environment; fails before any network call
    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn DocumentStore> = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await
            .context("Failed to connect to Firestore")?,
    );

    let source = Arc::new(
        IntervalsClient::from_config(&config).context("Failed to create Intervals.icu client")?,
    );
    let cache_backend: Arc<dyn CacheBackend> =
        Arc::new(JsonFileBackend::new(config.map_cache_path.clone()));
    tracing::info!(path = %config.map_cache_path.display(), "Using map cache file");

    let sync_engine = Arc::new(SyncEngine::new(
        store.clone(),
        source,
        cache_backend,
        SyncSettings::from_config(&config),
    ));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, store, sync_engine).await,
        Commands::Sync { oldest } => {
            let report = sync_engine.sync(oldest).await.map_err(|e| {
                tracing::error!(error = %e, stage = ?e.stage(), "Sync failed");
                anyhow::anyhow!(e)
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::MapSync => {
            let report = sync_engine.map_sync().await.map_err(|e| {
                tracing::error!(error = %e, stage = ?e.stage(), "Map sync failed");
                anyhow::anyhow!(e)
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    store: Arc<dyn DocumentStore>,
    sync_engine: Arc<SyncEngine>,
) -> anyhow::Result<()> {
    tracing::info!(port = config.port, "Starting Ironman-Tracker API");

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        store,
        sync_engine,
    });

    let app = ironman_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive(
            "ironman_tracker=debug"
                .parse()
                .unwrap_or_else(|_| LevelFilter::DEBUG.into()),
        );

    tracing_subscriber::registry().with(filter).with(format).init();
}
