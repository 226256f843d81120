//! tbvector-mon - TB screening monitoring backend
//!
//! Receives cough-audio uploads from edge devices and logged-in users,
//! forwards the audio to an external classifier, records the classification
//! callbacks, and serves staff review endpoints with real-time SSE
//! notifications.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tbvector_common::config::{ensure_root_folder, resolve_root_folder, MonConfig};
use tbvector_common::db::init_database;
use tbvector_common::events::EventBus;
use tbvector_mon::services::classifier::ClassifierHandle;
use tbvector_mon::services::devices::{run_offline_sweeper, SWEEP_PERIOD};
use tbvector_mon::services::storage::AudioStorage;
use tbvector_mon::{build_router, AppState};
use tracing::info;

/// TB screening monitoring backend
#[derive(Parser, Debug)]
#[command(name = "tbvector-mon", version)]
struct Args {
    /// Root folder holding the database and uploaded audio
    #[arg(long)]
    root_folder: Option<String>,

    /// Override the HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting TBVector Monitor (tbvector-mon) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "TBVECTOR_ROOT");
    ensure_root_folder(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let config = Arc::new(MonConfig::load(root_folder.clone(), args.port)?);

    let pool = init_database(&config.database_path()).await?;
    info!("✓ Connected to database");

    let storage = AudioStorage::new(&root_folder);
    storage.ensure_dirs().await?;

    let classifier =
        ClassifierHandle::spawn(config.classifier_url.clone(), config.classifier_timeout)?;
    info!("Classifier endpoint: {}", config.classifier_url);

    let bus = EventBus::new(config.event_capacity);

    // Background sweep: devices with stale heartbeats flip to OFFLINE
    tokio::spawn(run_offline_sweeper(pool.clone(), SWEEP_PERIOD));

    let state = AppState::new(pool, bus, config.clone(), storage, classifier);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "tbvector-mon listening on http://{}:{}",
        config.host, config.port
    );
    info!("Health check: http://{}:{}/health", config.host, config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
