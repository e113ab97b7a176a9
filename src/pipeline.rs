//! # Fetch → Transform → Push Pipeline
//!
//! One cycle of the bridge: fetch a snapshot from dump1090, turn each
//! aircraft into a Loki log entry, and push the batch.
//!
//! Any failure aborts the whole cycle. Nothing is pushed for a cycle whose
//! transform fails, and nothing is kept for the next one.

use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::adsb::{AircraftSnapshot, SourceFetcher};
use crate::error::Result;
use crate::loki::{service_labels, LogEntry, LokiPusher};

/// Outcome of a successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub aircraft_count: usize,
    pub entries_pushed: usize,
    pub duration: Duration,
}

/// Convert a snapshot into log entries
///
/// Produces one entry per aircraft in snapshot order. Every entry carries
/// the snapshot time (`floor(now * 1e9)` ns), the label set
/// `{"service": "adsb"}`, and the record's own JSON as its line.
///
/// # Arguments
///
/// * `snapshot` - Decoded aircraft snapshot
///
/// # Returns
///
/// * `Result<Vec<LogEntry>>` - Entries, empty for an empty aircraft list
///
/// # Errors
///
/// Returns [`crate::error::BridgeError::Decode`] if the snapshot time is
/// unusable and [`crate::error::BridgeError::Encode`] if any record fails to
/// serialize. No partial result is returned.
///
/// # Examples
///
/// ```
/// use adsb2loki::adsb::AircraftSnapshot;
/// use adsb2loki::pipeline::to_log_entries;
///
/// let snapshot = AircraftSnapshot::from_slice(
///     br#"{"now":1700000000.5,"messages":42,"aircraft":[{"hex":"abc123","alt_baro":35000}]}"#,
/// ).unwrap();
///
/// let entries = to_log_entries(&snapshot).unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].unix_nanos(), Some(1_700_000_000_500_000_000));
/// assert_eq!(entries[0].line, r#"{"hex":"abc123","alt_baro":35000}"#);
/// ```
pub fn to_log_entries(snapshot: &AircraftSnapshot) -> Result<Vec<LogEntry>> {
    if snapshot.aircraft.is_empty() {
        return Ok(Vec::new());
    }

    let timestamp = snapshot.timestamp()?;
    let labels = service_labels();

    snapshot
        .aircraft
        .iter()
        .enumerate()
        .map(|(index, aircraft)| {
            trace!(
                index,
                hex = aircraft.hex(),
                flight = aircraft.callsign().unwrap_or(""),
                lat = aircraft.latitude(),
                lon = aircraft.longitude(),
                "Processing aircraft"
            );
            let line = aircraft.to_json_line()?;
            Ok(LogEntry::new(timestamp, labels.clone(), line))
        })
        .collect()
}

/// The fetcher and pusher composed into one cycle
#[derive(Debug)]
pub struct Pipeline {
    fetcher: SourceFetcher,
    pusher: LokiPusher,
}

impl Pipeline {
    pub fn new(fetcher: SourceFetcher, pusher: LokiPusher) -> Self {
        Self { fetcher, pusher }
    }

    pub fn fetcher(&self) -> &SourceFetcher {
        &self.fetcher
    }

    pub fn pusher(&self) -> &LokiPusher {
        &self.pusher
    }

    /// Run one fetch → transform → push cycle
    ///
    /// The push step is skipped entirely when the snapshot holds no aircraft.
    ///
    /// # Errors
    ///
    /// Returns the first error from fetch, transform, or push.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let start = Instant::now();

        let snapshot = self.fetcher.fetch().await?;
        let entries = to_log_entries(&snapshot)?;
        debug!(entries_count = entries.len(), "Converted aircraft data to Loki entries");

        if !entries.is_empty() {
            self.pusher.push(&entries).await?;
        }

        let report = CycleReport {
            aircraft_count: snapshot.aircraft.len(),
            entries_pushed: entries.len(),
            duration: start.elapsed(),
        };

        info!(
            aircraft_count = report.aircraft_count,
            entries_pushed = report.entries_pushed,
            duration_ms = report.duration.as_millis() as u64,
            "Successfully fetched and pushed aircraft data"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adsb::AircraftRecord;
    use crate::error::BridgeError;
    use crate::loki::Credentials;
    use crate::transport::mocks::RecordingTransport;
    use crate::transport::{HttpResponse, MockHttpTransport};
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const SOURCE_URL: &str = "http://piaware.local:8080/data/aircraft.json";
    const LOKI_URL: &str = "http://loki.local:3100";

    const SCENARIO: &str = r#"{"now":1700000000.5,"messages":42,"aircraft":[{"hex":"abc123","flight":"UAL123","lat":40.1,"lon":-73.9,"alt_baro":35000}]}"#;

    fn snapshot(body: &str) -> AircraftSnapshot {
        AircraftSnapshot::from_slice(body.as_bytes()).unwrap()
    }

    fn pipeline(source: &RecordingTransport, loki: &RecordingTransport) -> Pipeline {
        let fetcher =
            SourceFetcher::new(SOURCE_URL, Duration::from_secs(30), Arc::new(source.clone())).unwrap();
        let pusher = LokiPusher::new(
            LOKI_URL,
            Credentials::new("tenant", "secret"),
            Duration::from_secs(10),
            Arc::new(loki.clone()),
        )
        .unwrap();
        Pipeline::new(fetcher, pusher)
    }

    #[test]
    fn test_entries_match_aircraft_count_and_order() {
        let snapshot = snapshot(
            r#"{"now":1700000123.25,"messages":7,"aircraft":[
                {"hex":"aaaaaa","rssi":-20.1},
                {"hex":"bbbbbb","alt_baro":"ground"},
                {"hex":"cccccc","flight":"DAL9   ","nav_modes":["autopilot","tcas"]}
            ]}"#,
        );

        let entries = to_log_entries(&snapshot).unwrap();
        assert_eq!(entries.len(), snapshot.aircraft.len());

        for (entry, aircraft) in entries.iter().zip(&snapshot.aircraft) {
            let decoded: AircraftRecord = serde_json::from_str(&entry.line).unwrap();
            assert_eq!(&decoded, aircraft);
            assert_eq!(entry.labels, service_labels());
        }
    }

    #[test]
    fn test_all_entries_share_snapshot_timestamp() {
        let snapshot = snapshot(
            r#"{"now":1700000000.25,"aircraft":[{"hex":"a"},{"hex":"b"},{"hex":"c"}]}"#,
        );
        let expected = 1_700_000_000_250_000_000i64;

        let entries = to_log_entries(&snapshot).unwrap();
        for entry in &entries {
            assert_eq!(entry.unix_nanos(), Some(expected));
        }
    }

    #[test]
    fn test_record_without_hex_still_forwarded() {
        let snapshot = snapshot(
            r#"{"now":1700000000.1,"aircraft":[{"hex":"abc123","alt_baro":35000},{"flight":"NOHEX","lat":52,"lon":0}]}"#,
        );

        let entries = to_log_entries(&snapshot).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].line, r#"{"flight":"NOHEX","lat":52,"lon":0}"#);
        assert_eq!(entries[1].unix_nanos(), Some(1_700_000_000_100_000_000));
    }

    #[test]
    fn test_empty_snapshot_yields_no_entries() {
        let entries = to_log_entries(&snapshot(r#"{"now":1700000000,"aircraft":[]}"#)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_altitude_forms_appear_verbatim_in_lines() {
        let snapshot = snapshot(
            r#"{"now":1700000000,"aircraft":[{"hex":"a","alt_baro":"ground"},{"hex":"b","alt_baro":15000}]}"#,
        );
        let entries = to_log_entries(&snapshot).unwrap();

        assert!(entries[0].line.contains(r#""alt_baro":"ground""#));
        assert!(entries[1].line.contains(r#""alt_baro":15000"#));
        assert!(!entries[1].line.contains("15000.0"));
    }

    #[test]
    fn test_bad_timestamp_aborts_transform() {
        let snapshot = AircraftSnapshot {
            now: f64::NAN,
            messages: 0,
            aircraft: vec![serde_json::from_str(r#"{"hex":"a"}"#).unwrap()],
        };
        assert!(matches!(to_log_entries(&snapshot), Err(BridgeError::Decode(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let source = RecordingTransport::new().respond(200, SCENARIO);
        let loki = RecordingTransport::new().respond(204, "");

        let report = pipeline(&source, &loki).run_cycle().await.unwrap();
        assert_eq!(report.aircraft_count, 1);
        assert_eq!(report.entries_pushed, 1);

        let pushes = loki.get_requests();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].url, "http://loki.local:3100/loki/api/v1/push");
        assert_eq!(pushes[0].header("authorization"), Some("Basic dGVuYW50OnNlY3JldA=="));

        let body = pushes[0].json_body();
        let line = r#"{"hex":"abc123","flight":"UAL123","lat":40.1,"lon":-73.9,"alt_baro":35000}"#;
        assert_eq!(body["streams"].as_array().unwrap().len(), 1);
        assert_eq!(body["streams"][0]["stream"], json!({"service": "adsb"}));
        assert_eq!(
            body["streams"][0]["values"][0],
            json!(["1700000000500000000", line])
        );

        let pushed: Value = serde_json::from_str(line).unwrap();
        let source_json: Value = serde_json::from_str(SCENARIO).unwrap();
        assert_eq!(pushed, source_json["aircraft"][0]);
    }

    #[tokio::test]
    async fn test_empty_snapshot_skips_push() {
        let source = RecordingTransport::new().respond(200, r#"{"now":1700000000,"messages":1,"aircraft":[]}"#);
        let loki = RecordingTransport::new();

        let report = pipeline(&source, &loki).run_cycle().await.unwrap();
        assert_eq!(report.aircraft_count, 0);
        assert_eq!(report.entries_pushed, 0);
        assert_eq!(loki.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_500_never_reaches_loki() {
        let source = RecordingTransport::new().respond(500, "");

        let mut loki = MockHttpTransport::new();
        loki.expect_execute().times(0);

        let fetcher =
            SourceFetcher::new(SOURCE_URL, Duration::from_secs(30), Arc::new(source.clone())).unwrap();
        let pusher = LokiPusher::new(LOKI_URL, None, Duration::from_secs(10), Arc::new(loki)).unwrap();

        let result = Pipeline::new(fetcher, pusher).run_cycle().await;
        assert!(matches!(result, Err(BridgeError::HttpStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_push_401_surfaces_as_authentication_error() {
        let source = RecordingTransport::new().respond(200, SCENARIO);

        let mut loki = MockHttpTransport::new();
        loki.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::UNAUTHORIZED, "")));

        let fetcher =
            SourceFetcher::new(SOURCE_URL, Duration::from_secs(30), Arc::new(source)).unwrap();
        let pusher = LokiPusher::new(
            LOKI_URL,
            Credentials::new("123456", "wrong"),
            Duration::from_secs(10),
            Arc::new(loki),
        )
        .unwrap();

        let err = Pipeline::new(fetcher, pusher).run_cycle().await.unwrap_err();
        assert!(err.is_authentication());
    }
}
