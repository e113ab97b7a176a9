//! # Loki Module
//!
//! Push side of the bridge: the Loki HTTP push API.
//!
//! This module handles:
//! - Log entries derived from aircraft records
//! - Encoding the `/loki/api/v1/push` JSON payload
//! - Posting it with optional Grafana Cloud basic authentication
//! - Classifying 401 separately from other failures

pub mod client;
pub mod entry;
pub mod payload;

pub use client::{Credentials, LokiPusher, PUSH_PATH};
pub use entry::{service_labels, Labels, LogEntry, SERVICE_LABEL, SERVICE_LABEL_VALUE};
