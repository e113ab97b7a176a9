//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files and the
//! environment.
//!
//! Every section and key is optional. Values are resolved in this order,
//! later wins:
//!
//! 1. Built-in defaults
//! 2. The TOML file, if one is given
//! 3. Environment variables (`LOKI_URL`, `FLIGHT_DATA_URL`, ...), which may
//!    come from a `.env` file loaded by `main`

use serde::de::Error;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::loki::Credentials;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub loki: LokiConfig,
    pub poll: PollConfig,
    pub logging: LoggingConfig,
    pub tracing: TracingConfig,
}

/// dump1090 endpoint configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_ms: u64,
}

/// Loki push configuration
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct LokiConfig {
    pub url: String,
    pub tenant_id: String,
    pub password: String,
    pub timeout_ms: u64,
}

/// Poll loop configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,

    /// Directory for daily rotated log files; empty logs to stdout only
    pub log_dir: String,
}

/// OpenTelemetry trace export configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub sampler: String,
    pub sample_ratio: f64,
    pub service_instance_id: Option<String>,
}

// Default value functions
fn default_source_url() -> String { "http://localhost:8080/data/aircraft.json".to_string() }
fn default_source_timeout_ms() -> u64 { 30_000 }

fn default_loki_url() -> String { "http://localhost:3100".to_string() }
fn default_loki_timeout_ms() -> u64 { 10_000 }

fn default_poll_interval_ms() -> u64 { 5_000 }

fn default_log_level() -> String { "info".to_string() }

fn default_otlp_endpoint() -> String { "http://localhost:4318".to_string() }
fn default_sampler() -> String { "always_on".to_string() }
fn default_sample_ratio() -> f64 { 0.1 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            url: default_loki_url(),
            tenant_id: String::new(),
            password: String::new(),
            timeout_ms: default_loki_timeout_ms(),
        }
    }
}

impl fmt::Debug for LokiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("LokiConfig")
            .field("url", &self.url)
            .field("tenant_id", &self.tenant_id)
            .field("password", &password)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otlp_endpoint(),
            sampler: default_sampler(),
            sample_ratio: default_sample_ratio(),
            service_instance_id: None,
        }
    }
}

/// Samplers accepted in `tracing.sampler` / `OTEL_TRACES_SAMPLER`
pub const SAMPLERS: &[&str] = &["always_on", "always_off", "traceidratio"];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use adsb2loki::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration from an optional file plus the process environment
    ///
    /// Environment variables override file values. The result is validated.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables
    ///
    /// Empty values are treated as unset, except for the Grafana
    /// credentials where an empty value clears the file setting.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = non_empty("FLIGHT_DATA_URL") {
            self.source.url = url;
        }
        if let Some(url) = non_empty("LOKI_URL") {
            self.loki.url = url;
        }
        if let Some(tenant_id) = lookup("GRAFANA_TENANT_ID") {
            self.loki.tenant_id = tenant_id.trim().to_string();
        }
        if let Some(password) = lookup("GRAFANA_PASSWORD") {
            self.loki.password = password;
        }
        if let Some(interval) = non_empty("POLL_INTERVAL_MS") {
            self.poll.interval_ms = parse_env("POLL_INTERVAL_MS", &interval)?;
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(enabled) = non_empty("OTEL_TRACING_ENABLED") {
            self.tracing.enabled = enabled == "true" || enabled == "1";
        }
        if let Some(endpoint) = non_empty("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT")
            .or_else(|| non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"))
        {
            self.tracing.endpoint = endpoint;
        }
        if let Some(sampler) = non_empty("OTEL_TRACES_SAMPLER") {
            self.tracing.sampler = sampler;
        }
        if let Some(ratio) = non_empty("OTEL_TRACES_SAMPLER_ARG") {
            self.tracing.sample_ratio = parse_env("OTEL_TRACES_SAMPLER_ARG", &ratio)?;
        }
        if let Some(instance_id) = non_empty("OTEL_SERVICE_INSTANCE_ID") {
            self.tracing.service_instance_id = Some(instance_id);
        }

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("source.url", &self.source.url), ("loki.url", &self.loki.url)] {
            if url.trim().is_empty() {
                return Err(config_error(format!("{} cannot be empty", name)));
            }
            if reqwest::Url::parse(url).is_err() {
                return Err(config_error(format!("{} is not a valid URL: {}", name, url)));
            }
        }

        // Validate timing fields
        if self.source.timeout_ms == 0 || self.source.timeout_ms > 300_000 {
            return Err(config_error("source.timeout_ms must be between 1 and 300000"));
        }

        if self.loki.timeout_ms == 0 || self.loki.timeout_ms > 300_000 {
            return Err(config_error("loki.timeout_ms must be between 1 and 300000"));
        }

        if self.poll.interval_ms < 100 || self.poll.interval_ms > 3_600_000 {
            return Err(config_error("poll.interval_ms must be between 100 and 3600000"));
        }

        // Validate trace sampling
        if !SAMPLERS.contains(&self.tracing.sampler.as_str()) {
            return Err(config_error(format!(
                "tracing.sampler must be one of: {}",
                SAMPLERS.join(", ")
            )));
        }

        if !(0.0..=1.0).contains(&self.tracing.sample_ratio) {
            return Err(config_error("tracing.sample_ratio must be between 0.0 and 1.0"));
        }

        Ok(())
    }

    /// Grafana Cloud credentials, present only when both parts are set
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.loki.tenant_id.clone(), self.loki.password.clone())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source.timeout_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.loki.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}

fn config_error(msg: impl fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| config_error(format!("{} has an invalid value: {}", key, value)))
}
