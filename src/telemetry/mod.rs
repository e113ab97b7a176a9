//! # Telemetry Module
//!
//! Sets up the process's own logs and traces.
//!
//! This module handles:
//! - Formatted log output to stdout, filtered by `RUST_LOG` or the configured level
//! - Optional daily rotated log files
//! - Optional OpenTelemetry trace export over OTLP/HTTP
//!
//! [`init`] is called once at startup and returns a [`TelemetryGuard`].
//! The guard owns the background log writer and must be kept alive for the
//! lifetime of the process; [`TelemetryGuard::shutdown`] flushes pending
//! log lines and spans on exit.

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::runtime::Tokio;
use opentelemetry_sdk::trace::{Config as OTelTraceConfig, Sampler, Tracer};
use opentelemetry_sdk::Resource;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig, TracingConfig};
use crate::error::{BridgeError, Result};

/// Service name reported in trace resources
pub const SERVICE_NAME: &str = "adsb2loki";

/// Prefix of rotated log file names
const LOG_FILE_PREFIX: &str = "adsb2loki.log";

/// Keeps telemetry background workers alive
///
/// Dropping the guard stops the file writer; call [`TelemetryGuard::shutdown`]
/// to also flush pending spans.
#[must_use = "dropping the guard stops background log and trace export"]
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    tracing_enabled: bool,
}

impl TelemetryGuard {
    /// Returns true when spans are exported over OTLP
    pub fn tracing_enabled(&self) -> bool {
        self.tracing_enabled
    }

    /// Flush and stop trace export
    pub fn shutdown(self) {
        if self.tracing_enabled {
            opentelemetry::global::shutdown_tracer_provider();
            tracing::debug!("OpenTelemetry tracing shutdown successfully");
        }
    }
}

/// Initialize logging and tracing for the process
///
/// # Arguments
///
/// * `config` - Resolved configuration
///
/// # Returns
///
/// * `Result<TelemetryGuard>` - Guard to hold until shutdown
///
/// # Errors
///
/// Returns error if a global subscriber is already installed. A failure to
/// build the trace exporter is not an error: it is logged and the process
/// continues without trace export.
pub fn init(config: &Config) -> Result<TelemetryGuard> {
    let env_filter = build_env_filter(&config.logging);

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let (file_layer, file_guard) = match file_writer(&config.logging) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let tracer = if config.tracing.enabled {
        Some(build_tracer(&config.tracing))
    } else {
        None
    };

    let (otel_layer, tracer_error) = match tracer {
        Some(Ok(tracer)) => (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let tracing_enabled = otel_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| BridgeError::Telemetry(e.to_string()))?;

    info!(
        level = %parse_log_level(&config.logging.level),
        file_output = !config.logging.log_dir.is_empty(),
        "Logger initialized"
    );

    if let Some(e) = tracer_error {
        warn!(error = %e, "Failed to initialize OpenTelemetry tracing, continuing without it");
    } else if tracing_enabled {
        info!(
            service = SERVICE_NAME,
            endpoint = %normalize_otlp_http_endpoint(&config.tracing.endpoint),
            sampler = %config.tracing.sampler,
            "OpenTelemetry tracing initialized successfully"
        );
    } else {
        info!("OpenTelemetry tracing is disabled");
    }

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        tracing_enabled,
    })
}

/// Map a configured level name to a tracing level
///
/// Unknown names fall back to `INFO`.
///
/// # Examples
///
/// ```
/// use adsb2loki::telemetry::parse_log_level;
/// use tracing::Level;
///
/// assert_eq!(parse_log_level("debug"), Level::DEBUG);
/// assert_eq!(parse_log_level("WARNING"), Level::WARN);
/// assert_eq!(parse_log_level("chatty"), Level::INFO);
/// ```
pub fn parse_log_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins when set, otherwise the configured level
fn build_env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(parse_log_level(&logging.level).into()))
}

fn file_writer(
    logging: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if logging.log_dir.trim().is_empty() {
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

fn build_tracer(tracing: &TracingConfig) -> std::result::Result<Tracer, opentelemetry::trace::TraceError> {
    let endpoint = normalize_otlp_http_endpoint(&tracing.endpoint);
    let exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(endpoint);

    let resource = Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("service.instance.id", service_instance_id(tracing)),
    ]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            OTelTraceConfig::default()
                .with_resource(resource)
                .with_sampler(sampler(tracing)),
        )
        .install_batch(Tokio)
}

/// Sampler for the configured name, `always_on` for anything unrecognized
fn sampler(tracing: &TracingConfig) -> Sampler {
    match tracing.sampler.as_str() {
        "always_off" => Sampler::AlwaysOff,
        "traceidratio" => Sampler::TraceIdRatioBased(tracing.sample_ratio),
        _ => Sampler::AlwaysOn,
    }
}

/// Configured instance id, else the host name, else `pid-<pid>`
fn service_instance_id(tracing: &TracingConfig) -> String {
    tracing
        .service_instance_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.trim().is_empty()))
        .unwrap_or_else(|| format!("pid-{}", std::process::id()))
}

/// Ensure the OTLP endpoint ends in `/v1/traces`
fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Level::TRACE);
        assert_eq!(parse_log_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_log_level(" info "), Level::INFO);
        assert_eq!(parse_log_level("warn"), Level::WARN);
        assert_eq!(parse_log_level("warning"), Level::WARN);
        assert_eq!(parse_log_level("error"), Level::ERROR);
    }

    #[test]
    fn test_unknown_log_level_defaults_to_info() {
        assert_eq!(parse_log_level(""), Level::INFO);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_normalize_otlp_endpoint() {
        assert_eq!(
            normalize_otlp_http_endpoint("http://localhost:4318"),
            "http://localhost:4318/v1/traces"
        );
        assert_eq!(
            normalize_otlp_http_endpoint("http://localhost:4318/"),
            "http://localhost:4318/v1/traces"
        );
        assert_eq!(
            normalize_otlp_http_endpoint("http://tempo:4318/v1/traces"),
            "http://tempo:4318/v1/traces"
        );
        assert_eq!(normalize_otlp_http_endpoint("  "), "");
    }

    #[test]
    fn test_sampler_selection() {
        let mut config = TracingConfig::default();
        assert!(matches!(sampler(&config), Sampler::AlwaysOn));

        config.sampler = "always_off".to_string();
        assert!(matches!(sampler(&config), Sampler::AlwaysOff));

        config.sampler = "traceidratio".to_string();
        config.sample_ratio = 0.25;
        match sampler(&config) {
            Sampler::TraceIdRatioBased(ratio) => assert_eq!(ratio, 0.25),
            other => panic!("Expected TraceIdRatioBased, got: {:?}", other),
        }
    }

    #[test]
    fn test_configured_instance_id_wins() {
        let config = TracingConfig {
            service_instance_id: Some("piaware-1".to_string()),
            ..TracingConfig::default()
        };
        assert_eq!(service_instance_id(&config), "piaware-1");
    }

    #[test]
    fn test_instance_id_never_empty() {
        let config = TracingConfig {
            service_instance_id: Some("   ".to_string()),
            ..TracingConfig::default()
        };
        assert!(!service_instance_id(&config).trim().is_empty());
    }

    #[test]
    fn test_init_without_trace_export() {
        let guard = init(&Config::default()).unwrap();
        assert!(!guard.tracing_enabled());

        // A second global subscriber is refused
        assert!(matches!(init(&Config::default()), Err(BridgeError::Telemetry(_))));
        guard.shutdown();
    }

    #[test]
    fn test_no_file_writer_without_log_dir() {
        assert!(file_writer(&LoggingConfig::default()).is_none());
    }

    #[test]
    fn test_file_writer_with_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logging = LoggingConfig {
            level: "info".to_string(),
            log_dir: dir.path().to_string_lossy().into_owned(),
        };
        assert!(file_writer(&logging).is_some());
    }
}
