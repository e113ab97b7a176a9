//! # Error Types
//!
//! Custom error types for adsb2loki using `thiserror`.
//!
//! Every failure of a fetch, transform, or push aborts only the current
//! cycle. Configuration and telemetry setup errors are the only ones that
//! reach `main`.

use thiserror::Error;

/// Main error type for adsb2loki
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connection, DNS, or timeout failure on either HTTP call
    #[error("Network error calling {url}: {reason}")]
    Network { url: String, reason: String },

    /// Non-success HTTP status from either endpoint
    #[error("HTTP request to {url} failed with status: {status} {text}")]
    HttpStatus { url: String, status: u16, text: String },

    /// Loki rejected the configured credentials
    #[error("Authentication failed for {url}: {status} Unauthorized")]
    Authentication { url: String, status: u16 },

    /// Response body is not a valid aircraft snapshot
    #[error("Decode error: {0}")]
    Decode(String),

    /// Record or payload could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// A configured URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Logging or trace exporter setup failed
    #[error("Telemetry setup error: {0}")]
    Telemetry(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns true when Loki answered 401 Unauthorized.
    pub fn is_authentication(&self) -> bool {
        matches!(self, BridgeError::Authentication { .. })
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::HttpStatus { status, .. } | BridgeError::Authentication { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type alias for adsb2loki
pub type Result<T> = std::result::Result<T, BridgeError>;
