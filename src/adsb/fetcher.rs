//! # Source Fetcher
//!
//! Retrieves one aircraft snapshot from the dump1090 JSON endpoint.

use reqwest::{Method, Request, StatusCode, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::model::AircraftSnapshot;
use crate::error::{BridgeError, Result};
use crate::transport::HttpTransport;

/// Fetches `aircraft.json` snapshots
///
/// Holds only its construction-time configuration; every call to
/// [`SourceFetcher::fetch`] issues exactly one GET and never retries.
pub struct SourceFetcher {
    url: Url,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for SourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFetcher")
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SourceFetcher {
    /// Create a fetcher for the given endpoint
    ///
    /// # Arguments
    ///
    /// * `url` - Full URL of the snapshot, e.g. `http://piaware:8080/data/aircraft.json`
    /// * `timeout` - Upper bound on each request
    /// * `transport` - Executes the HTTP request
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidUrl`] if `url` cannot be parsed.
    pub fn new(url: &str, timeout: Duration, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", url, e)))?;

        Ok(Self {
            url,
            timeout,
            transport,
        })
    }

    /// Endpoint this fetcher polls
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and decode one snapshot
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Network`] - request could not be completed
    /// * [`BridgeError::HttpStatus`] - any status other than 200
    /// * [`BridgeError::Decode`] - body is not a valid snapshot
    #[tracing::instrument(name = "source_fetch", skip_all, fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<AircraftSnapshot> {
        let mut request = Request::new(Method::GET, self.url.clone());
        *request.timeout_mut() = Some(self.timeout);

        let start = Instant::now();
        let response = self.transport.execute(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = response.map_err(|e| {
            error!(error = %e, url = %self.url, duration_ms, "Failed to fetch dump1090 data");
            e
        })?;

        debug!(
            method = "GET",
            url = %self.url,
            status_code = response.status.as_u16(),
            duration_ms,
            "HTTP call"
        );

        if response.status != StatusCode::OK {
            error!(
                status_code = response.status.as_u16(),
                status = response.status_text(),
                "HTTP request returned non-200 status"
            );
            return Err(BridgeError::HttpStatus {
                url: self.url.to_string(),
                status: response.status.as_u16(),
                text: response.status_text().to_string(),
            });
        }

        let snapshot = AircraftSnapshot::from_slice(&response.body).map_err(|e| {
            error!(error = %e, body_size = response.body.len(), "Failed to decode dump1090 data");
            e
        })?;

        debug!(
            aircraft_count = snapshot.aircraft.len(),
            timestamp = snapshot.now,
            messages = snapshot.messages,
            "Successfully parsed flight data"
        );

        Ok(snapshot)
    }
}
