//! # adsb2loki
//!
//! Forward ADS-B aircraft snapshots from a dump1090 receiver to Grafana Loki.
//!
//! Polls the receiver's `aircraft.json` on a fixed interval and pushes one
//! log line per tracked aircraft to Loki, locally or on Grafana Cloud.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use adsb2loki::adsb::SourceFetcher;
use adsb2loki::bridge::{watch_signals, Bridge};
use adsb2loki::config::Config;
use adsb2loki::loki::LokiPusher;
use adsb2loki::pipeline::Pipeline;
use adsb2loki::telemetry;
use adsb2loki::transport::ReqwestTransport;

/// Config file used when neither an argument nor `ADSB2LOKI_CONFIG` is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file
const CONFIG_PATH_ENV: &str = "ADSB2LOKI_CONFIG";

/// Main entry point for adsb2loki
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load `.env` (absent in production, which is fine)
///    - Resolve configuration: defaults, TOML file, environment overrides
///    - Set up logging and optional OTLP trace export
///    - Build the fetcher and pusher around one shared HTTP client
///
/// 2. **Main Loop**
///    - Every poll interval (default 5s): fetch → transform → push
///    - Failed cycles are logged and the next tick tries again
///    - Ticks that arrive while a cycle is running are skipped
///
/// 3. **Graceful Shutdown**
///    - SIGINT / SIGTERM cancel the loop, including an in-flight cycle
///    - Pending spans and log lines are flushed
///
/// # Errors
///
/// Returns error if:
/// - Configuration is missing or invalid
/// - Logging cannot be initialized
/// - Signal handlers cannot be installed
///
/// # Examples
///
/// ```bash
/// LOKI_URL=http://localhost:3100 \
/// FLIGHT_DATA_URL=http://piaware.local:8080/data/aircraft.json \
/// cargo run --release
/// ```
///
/// Expected output:
/// ```text
/// INFO adsb2loki::telemetry: Logger initialized level=INFO file_output=false
/// INFO adsb2loki: adsb2loki v0.1.0 starting...
/// INFO adsb2loki: No authentication configured - using local Grafana instance mode
/// INFO adsb2loki::bridge: Starting data fetch loop interval_ms=5000 ...
/// INFO adsb2loki::pipeline: Successfully fetched and pushed aircraft data aircraft_count=12 entries_pushed=12
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    let env_file = dotenvy::dotenv();

    let path = config_path(std::env::args().nth(1), std::env::var(CONFIG_PATH_ENV).ok());
    let config = Config::resolve(path.as_deref()).context("failed to load configuration")?;

    let telemetry = telemetry::init(&config).context("failed to initialize logging")?;

    info!("adsb2loki v{} starting...", env!("CARGO_PKG_VERSION"));
    match &env_file {
        Ok(file) => debug!(path = %file.display(), "Environment file loaded successfully"),
        Err(e) => debug!(error = %e, "Environment file not found (this is normal in production)"),
    }
    match &path {
        Some(path) => debug!(path = %path.display(), "Configuration file loaded"),
        None => debug!("No configuration file, using defaults and environment"),
    }
    debug!(config = ?config, "Effective configuration");

    let client = reqwest::Client::builder()
        .user_agent(concat!("adsb2loki/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let transport = Arc::new(ReqwestTransport::new(client));

    let credentials = config.credentials();
    match &credentials {
        Some(credentials) => {
            info!(tenant_id = credentials.tenant_id(), "Using Grafana Cloud authentication");
            debug!(tenant_id = credentials.tenant_id(), password_set = true, "Grafana Cloud credentials found");
        }
        None => {
            if !config.loki.tenant_id.is_empty() || !config.loki.password.is_empty() {
                debug!(
                    tenant_id = %config.loki.tenant_id,
                    password_set = !config.loki.password.is_empty(),
                    "Incomplete Grafana Cloud credentials, sending without authentication"
                );
            }
            info!("No authentication configured - using local Grafana instance mode");
        }
    }

    let fetcher = SourceFetcher::new(&config.source.url, config.source_timeout(), transport.clone())?;
    let pusher = LokiPusher::new(&config.loki.url, credentials, config.push_timeout(), transport)?;
    let bridge = Bridge::new(Pipeline::new(fetcher, pusher), config.poll_interval());

    let shutdown = CancellationToken::new();
    let _signals = watch_signals(shutdown.clone()).context("failed to install signal handlers")?;

    info!("Application started successfully");
    bridge.run(shutdown).await;

    if telemetry.tracing_enabled() {
        info!("Flushing pending trace spans");
    }
    telemetry.shutdown();
    Ok(())
}

/// Pick the config file: CLI argument, then `ADSB2LOKI_CONFIG`, then the
/// default path if it exists
fn config_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    let explicit = arg
        .into_iter()
        .chain(env)
        .map(|p| p.trim().to_string())
        .find(|p| !p.is_empty());

    match explicit {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
    }
}
