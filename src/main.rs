//! Clickstream analytics service
//!
//! - Browser event collection with session derivation
//! - Dashboard statistics over the stored event history
//! - Background cache sweep, retention and store health checks

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use analytics::{Analytics, AnalyticsConfig};
use api::{router, AppState};
use engine_core::{Clock, SystemClock};
use store::{StoreBackend, StoreConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{RetentionWorker, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    analytics: AnalyticsConfig,

    #[serde(default)]
    worker: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: StoreConfig::default(),
            analytics: AnalyticsConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting clickstream v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        backend = ?config.store.backend,
        display_utc_offset_minutes = config.analytics.display_utc_offset_minutes,
        active_session_minutes = config.analytics.active_session_minutes,
        "Loaded configuration"
    );

    let store = store::connect(&config.store)
        .await
        .context("Failed to initialize store")?;

    match store.ping().await {
        Ok(()) => {
            health().store.set_healthy();
            info!(backend = store.backend(), "Store connection: healthy");
        }
        Err(e) => {
            health().store.set_unhealthy(e.to_string());
            error!(backend = store.backend(), error = %e, "Store connection: unhealthy");
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let analytics = Analytics::new(
        store.clone(),
        config.store.tables.clone(),
        clock.clone(),
        &config.analytics,
    )
    .context("Invalid analytics configuration")?;

    // Start background workers
    let retention = RetentionWorker::new(store.clone(), config.store.tables.clone(), clock);
    let worker_scheduler = Arc::new(WorkerScheduler::new(
        config.worker.clone(),
        store.clone(),
        analytics.cache().clone(),
        retention,
    ));
    let worker_handles = worker_scheduler.start();

    let app = router(AppState::new(store, analytics));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down...");
    for handle in worker_handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CLICKSTREAM")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the most common deployment settings
    if let Ok(backend) = std::env::var("CLICKSTREAM_STORE_BACKEND") {
        match backend.parse::<StoreBackend>() {
            Ok(backend) => config.store.backend = backend,
            Err(e) => warn!("Ignoring CLICKSTREAM_STORE_BACKEND: {}", e),
        }
    }
    if let Ok(url) = std::env::var("CLICKSTREAM_CLICKHOUSE_URL") {
        config.store.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("CLICKSTREAM_CLICKHOUSE_DATABASE") {
        config.store.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("CLICKSTREAM_CLICKHOUSE_USERNAME") {
        config.store.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("CLICKSTREAM_CLICKHOUSE_PASSWORD") {
        config.store.clickhouse.password = Some(password);
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
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
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
