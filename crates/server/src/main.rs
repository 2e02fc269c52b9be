use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movetools_core::{
    load_config, load_config_from_env, mover::event_channel, validate_config, Collaborators,
    Config, FsMover, FsSizeProbe, MoveService, TomlSettingsStore, TorrentRegistry,
};
use movetools_server::api::create_router;
use movetools_server::state::AppState;

/// Config file used when `MOVETOOLS_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = resolve_config()?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Settings file: {:?}", config.settings.path);

    let settings = Arc::new(
        TomlSettingsStore::open(&config.settings.path).with_context(|| {
            format!("Failed to open settings file {:?}", config.settings.path)
        })?,
    );
    let registry = Arc::new(TorrentRegistry::new());

    // Create mover and service
    let (events_tx, events_rx) = event_channel();
    let mover = Arc::new(FsMover::new(config.mover.clone(), events_tx));

    let service = Arc::new(MoveService::new(
        config.scheduler.clone(),
        Collaborators {
            mover,
            events: events_rx,
            enumerator: registry.clone(),
            settings,
            probe: Arc::new(FsSizeProbe::new()),
        },
    ));
    service.start().await;
    info!("Move service started");

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&service),
        registry,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);
    if !addr.ip().is_loopback() {
        warn!("API has no authentication and is reachable beyond this host on {}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    service.stop().await;

    Ok(())
}

/// Load the config file named by `MOVETOOLS_CONFIG`.
///
/// An explicitly named file must exist. Without the variable, a missing
/// `config.toml` falls back to defaults plus environment overrides.
fn resolve_config() -> Result<Config> {
    match std::env::var("MOVETOOLS_CONFIG") {
        Ok(path) => {
            let config_path = PathBuf::from(path);
            info!("Loading configuration from {:?}", config_path);
            load_config(&config_path)
                .with_context(|| format!("Failed to load config from {:?}", config_path))
        }
        Err(_) => {
            let config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if config_path.exists() {
                info!("Loading configuration from {:?}", config_path);
                load_config(&config_path)
                    .with_context(|| format!("Failed to load config from {:?}", config_path))
            } else {
                info!("No config file, using defaults and environment");
                load_config_from_env().context("Failed to load config from environment")
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
