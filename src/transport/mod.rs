//! Trait abstraction for HTTP request execution to enable testing
//!
//! The fetcher and pusher build fully formed [`reqwest::Request`] values and
//! hand them to an [`HttpTransport`]. Production code uses
//! [`ReqwestTransport`]; tests substitute a recording double or a `mockall`
//! mock so no test touches the network.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Request, StatusCode};

use crate::error::{BridgeError, Result};

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reason phrase for the status, empty for non-standard codes
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }
}

/// Trait for executing a single HTTP request
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and read the full response body.
    ///
    /// Connection, DNS, timeout, and body read failures are reported as
    /// [`BridgeError::Network`]. HTTP statuses are never errors at this layer.
    async fn execute(&self, request: Request) -> Result<HttpResponse>;
}

/// Wrapper around `reqwest::Client` that implements HttpTransport
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<HttpResponse> {
        let url = request.url().to_string();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| network_error(&url, e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| network_error(&url, e))?;

        Ok(HttpResponse { status, body })
    }
}

fn network_error(url: &str, err: reqwest::Error) -> BridgeError {
    let reason = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };

    BridgeError::Network {
        url: url.to_string(),
        reason,
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Snapshot of a request seen by [`RecordingTransport`]
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: String,
        pub headers: HeaderMap,
        pub body: Option<Vec<u8>>,
        pub timeout: Option<Duration>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }

        pub fn json_body(&self) -> serde_json::Value {
            let body = self.body.as_deref().unwrap_or_default();
            serde_json::from_slice(body).unwrap()
        }
    }

    /// Scripted reply for the next request
    #[derive(Debug, Clone)]
    pub enum Reply {
        Respond(u16, String),
        Fail(String),
    }

    /// Mock transport that records requests and replays scripted responses
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
        pub replies: Arc<Mutex<VecDeque<Reply>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response with the given status and body
        pub fn respond(self, status: u16, body: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Reply::Respond(status, body.to_string()));
            self
        }

        /// Queue a network failure
        pub fn fail(self, reason: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Reply::Fail(reason.to_string()));
            self
        }

        pub fn get_requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn execute(&self, request: Request) -> Result<HttpResponse> {
            let recorded = RecordedRequest {
                method: request.method().clone(),
                url: request.url().to_string(),
                headers: request.headers().clone(),
                body: request.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
                timeout: request.timeout().copied(),
            };
            self.requests.lock().unwrap().push(recorded);

            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Respond(200, String::new()));

            match reply {
                Reply::Respond(status, body) => Ok(HttpResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    body,
                )),
                Reply::Fail(reason) => Err(BridgeError::Network {
                    url: request.url().to_string(),
                    reason,
                }),
            }
        }
    }
}
