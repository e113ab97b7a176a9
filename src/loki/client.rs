//! # Loki Push Client
//!
//! Posts encoded log entries to a Loki instance, local or Grafana Cloud.
//!
//! The pusher is configured once at startup (base URL, optional
//! credentials, timeout) and holds no other state between pushes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Body, Method, Request, StatusCode, Url};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::entry::LogEntry;
use super::payload::encode_push_request;
use crate::error::{BridgeError, Result};
use crate::transport::HttpTransport;

/// Path of the Loki push endpoint, appended to the configured base URL
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Grafana Cloud tenant credentials
///
/// The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    tenant_id: String,
    password: String,
}

impl Credentials {
    /// Build credentials when both parts are non-empty.
    ///
    /// Returns `None` if either the tenant id or the password is empty, in
    /// which case requests are sent without an `Authorization` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use adsb2loki::loki::Credentials;
    ///
    /// assert!(Credentials::new("123456", "glc_token").is_some());
    /// assert!(Credentials::new("123456", "").is_none());
    /// assert!(Credentials::new("", "").is_none());
    /// ```
    pub fn new(tenant_id: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let tenant_id = tenant_id.into();
        let password = password.into();

        if tenant_id.is_empty() || password.is_empty() {
            return None;
        }

        Some(Self {
            tenant_id,
            password,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// `Basic base64(tenant:password)`, marked sensitive
    fn authorization_header(&self) -> Result<HeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.tenant_id, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|e| BridgeError::Encode(format!("invalid authorization header: {}", e)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Loki HTTP push client
pub struct LokiPusher {
    push_url: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for LokiPusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LokiPusher")
            .field("push_url", &self.push_url.as_str())
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LokiPusher {
    /// Create a pusher for the Loki instance at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Loki root, e.g. `http://localhost:3100` (trailing slash tolerated)
    /// * `credentials` - Grafana Cloud tenant credentials, if any
    /// * `timeout` - Upper bound on each push request
    /// * `transport` - Executes the HTTP request
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidUrl`] if `base_url` cannot be parsed.
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let push_url = push_url(base_url)?;

        debug!(
            url = %push_url,
            timeout_ms = timeout.as_millis() as u64,
            auth = credentials.is_some(),
            "Loki client created"
        );

        Ok(Self {
            push_url,
            credentials,
            timeout,
            transport,
        })
    }

    /// Full push endpoint URL
    pub fn push_url(&self) -> &Url {
        &self.push_url
    }

    /// Returns true when requests carry basic authentication
    pub fn has_auth(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send log entries to Loki
    ///
    /// An empty slice succeeds without issuing any request.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Network`] - request could not be completed
    /// * [`BridgeError::Authentication`] - Loki answered 401
    /// * [`BridgeError::HttpStatus`] - any other status >= 400
    /// * [`BridgeError::Encode`] - payload could not be built
    #[tracing::instrument(name = "loki_push", skip_all, fields(entries_count = entries.len()))]
    pub async fn push(&self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            debug!("No entries to push, skipping");
            return Ok(());
        }

        let body = encode_push_request(entries)?;
        debug!(
            payload_size = body.len(),
            streams_count = entries.len(),
            "Loki payload marshaled"
        );

        let request = self.build_request(body)?;

        let start = Instant::now();
        let response = self.transport.execute(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = response.map_err(|e| {
            error!(error = %e, url = %self.push_url, duration_ms, "HTTP request failed");
            e
        })?;

        debug!(
            method = "POST",
            url = %self.push_url,
            status_code = response.status.as_u16(),
            duration_ms,
            entries_count = entries.len(),
            "HTTP call"
        );

        if response.status == StatusCode::UNAUTHORIZED {
            error!(
                status_code = response.status.as_u16(),
                tenant_id = self.credentials.as_ref().map(Credentials::tenant_id).unwrap_or(""),
                "Authentication failed"
            );
            return Err(BridgeError::Authentication {
                url: self.push_url.to_string(),
                status: response.status.as_u16(),
            });
        }

        if response.status.as_u16() >= 400 {
            error!(
                status_code = response.status.as_u16(),
                status = response.status_text(),
                "HTTP request failed with bad status"
            );
            return Err(BridgeError::HttpStatus {
                url: self.push_url.to_string(),
                status: response.status.as_u16(),
                text: response.status_text().to_string(),
            });
        }

        debug!(
            entries_count = entries.len(),
            status_code = response.status.as_u16(),
            "Successfully pushed logs to Loki"
        );
        Ok(())
    }

    fn build_request(&self, body: Vec<u8>) -> Result<Request> {
        let mut request = Request::new(Method::POST, self.push_url.clone());
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(credentials) = &self.credentials {
            request
                .headers_mut()
                .insert(AUTHORIZATION, credentials.authorization_header()?);
            debug!(tenant_id = credentials.tenant_id(), "Added basic authentication to request");
        }

        *request.body_mut() = Some(Body::from(body));
        *request.timeout_mut() = Some(self.timeout);
        Ok(request)
    }
}

/// Join the base URL with [`PUSH_PATH`]
fn push_url(base_url: &str) -> Result<Url> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), PUSH_PATH);
    Url::parse(&joined).map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", joined, e)))
}
