//! # Loki Push Payload Encoder
//!
//! Encodes log entries into the JSON body accepted by `POST /loki/api/v1/push`.
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "streams": [
//!     { "stream": {"service": "adsb"}, "values": [["<unix-ns>", "<line>"]] },
//!     ...
//!   ]
//! }
//! ```
//!
//! Each entry becomes its own stream object holding exactly one value pair.
//! Entries that share a label set are not merged.

use serde::Serialize;

use super::entry::{Labels, LogEntry};
use crate::error::{BridgeError, Result};

/// Top-level push request body
#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub streams: Vec<PushStream<'a>>,
}

/// One labelled stream with its `[timestamp, line]` pairs
#[derive(Debug, Serialize)]
pub struct PushStream<'a> {
    pub stream: &'a Labels,
    pub values: Vec<[String; 2]>,
}

impl<'a> PushRequest<'a> {
    /// Build the request body, one stream per entry
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encode`] if an entry's timestamp cannot be
    /// expressed in nanoseconds.
    pub fn from_entries(entries: &'a [LogEntry]) -> Result<Self> {
        let streams = entries
            .iter()
            .map(|entry| {
                let nanos = entry.unix_nanos().ok_or_else(|| {
                    BridgeError::Encode(format!(
                        "timestamp {} out of nanosecond range",
                        entry.timestamp
                    ))
                })?;

                Ok(PushStream {
                    stream: &entry.labels,
                    values: vec![[nanos.to_string(), entry.line.clone()]],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { streams })
    }
}

/// Encode entries into a complete push request body
///
/// # Arguments
///
/// * `entries` - Log entries to send (may be empty)
///
/// # Returns
///
/// * `Result<Vec<u8>>` - JSON bytes ready to POST
///
/// # Examples
///
/// ```
/// use adsb2loki::loki::payload::encode_push_request;
/// use adsb2loki::loki::{service_labels, LogEntry};
/// use chrono::{TimeZone, Utc};
///
/// let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let entries = vec![LogEntry::new(ts, service_labels(), r#"{"hex":"abc123"}"#.to_string())];
/// let body = encode_push_request(&entries).unwrap();
/// let text = String::from_utf8(body).unwrap();
/// assert!(text.starts_with(r#"{"streams":[{"stream":{"service":"adsb"}"#));
/// ```
pub fn encode_push_request(entries: &[LogEntry]) -> Result<Vec<u8>> {
    let request = PushRequest::from_entries(entries)?;

    serde_json::to_vec(&request)
        .map_err(|e| BridgeError::Encode(format!("failed to marshal Loki payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loki::entry::service_labels;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn entry(secs: i64, nanos: u32, line: &str) -> LogEntry {
        LogEntry::new(
            Utc.timestamp_opt(secs, nanos).unwrap(),
            service_labels(),
            line.to_string(),
        )
    }

    #[test]
    fn test_encode_single_entry_exact_bytes() {
        let entries = vec![entry(1_700_000_000, 500_000_000, r#"{"hex":"abc123"}"#)];
        let body = encode_push_request(&entries).unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"streams":[{"stream":{"service":"adsb"},"values":[["1700000000500000000","{\"hex\":\"abc123\"}"]]}]}"#
        );
    }

    #[test]
    fn test_identical_labels_are_not_merged() {
        let entries = vec![
            entry(1_700_000_000, 0, r#"{"hex":"a"}"#),
            entry(1_700_000_000, 0, r#"{"hex":"b"}"#),
            entry(1_700_000_000, 0, r#"{"hex":"c"}"#),
        ];
        let body: Value = serde_json::from_slice(&encode_push_request(&entries).unwrap()).unwrap();

        let streams = body["streams"].as_array().unwrap();
        assert_eq!(streams.len(), 3);
        for (stream, hex) in streams.iter().zip(["a", "b", "c"]) {
            assert_eq!(stream["stream"], json!({"service": "adsb"}));
            let values = stream["values"].as_array().unwrap();
            assert_eq!(values.len(), 1);
            assert_eq!(values[0][0], json!("1700000000000000000"));
            assert_eq!(values[0][1], json!(format!(r#"{{"hex":"{}"}}"#, hex)));
        }
    }

    #[test]
    fn test_encode_empty_entries() {
        let body = encode_push_request(&[]).unwrap();
        assert_eq!(body, br#"{"streams":[]}"#);
    }

    #[test]
    fn test_timestamp_out_of_range_is_encode_error() {
        let far_future = entry(20_000_000_000, 0, "{}");
        let result = encode_push_request(&[far_future]);
        assert!(matches!(result, Err(BridgeError::Encode(_))));
    }
}
