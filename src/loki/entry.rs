//! # Log Entries
//!
//! One entry per aircraft per cycle. Entries live only for the duration of
//! a single push.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Label key identifying the producing service
pub const SERVICE_LABEL: &str = "service";

/// Label value attached to every aircraft line
pub const SERVICE_LABEL_VALUE: &str = "adsb";

/// Loki stream labels, ordered for stable encoding
pub type Labels = BTreeMap<String, String>;

/// The fixed label set `{"service": "adsb"}`
pub fn service_labels() -> Labels {
    BTreeMap::from([(SERVICE_LABEL.to_string(), SERVICE_LABEL_VALUE.to_string())])
}

/// A single timestamped log line destined for Loki
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub labels: Labels,
    pub line: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, labels: Labels, line: String) -> Self {
        Self {
            timestamp,
            labels,
            line,
        }
    }

    /// Nanoseconds since the epoch, `None` past the year 2262
    pub fn unix_nanos(&self) -> Option<i64> {
        self.timestamp.timestamp_nanos_opt()
    }
}
