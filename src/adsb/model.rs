//! # Aircraft Snapshot Model
//!
//! Types decoded from the dump1090 `aircraft.json` document.
//!
//! ## Open records
//!
//! dump1090 emits dozens of optional fields per aircraft and adds new ones
//! between releases. Only the fields the bridge looks at are typed; every
//! other field is kept verbatim in [`AircraftRecord::extra`] and written back
//! out when the record is re-encoded, so a log line always carries the full
//! record.
//!
//! ## Barometric altitude
//!
//! `alt_baro` is either a number of feet or the literal string `"ground"`:
//!
//! ```
//! use adsb2loki::adsb::model::Altitude;
//!
//! let on_ground: Altitude = serde_json::from_str("\"ground\"").unwrap();
//! assert!(on_ground.is_on_ground());
//!
//! let cruising: Altitude = serde_json::from_str("35000").unwrap();
//! assert_eq!(cruising.feet(), Some(35000.0));
//! assert_eq!(serde_json::to_string(&cruising).unwrap(), "35000");
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{BridgeError, Result};

/// Literal dump1090 uses for `alt_baro` when the aircraft is on the ground
pub const ALT_BARO_GROUND: &str = "ground";

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// One decoded response from the telemetry endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AircraftSnapshot {
    /// Seconds since the Unix epoch, fractional
    pub now: f64,

    /// Total Mode S messages processed by the receiver
    #[serde(default)]
    pub messages: u64,

    /// Tracked aircraft, in receiver order
    pub aircraft: Vec<AircraftRecord>,
}

impl AircraftSnapshot {
    /// Decode a snapshot from a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Decode`] if the body is not JSON or is missing
    /// `now` / `aircraft`.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| BridgeError::Decode(format!("invalid aircraft snapshot: {}", e)))
    }

    /// Snapshot time truncated to nanosecond resolution.
    ///
    /// Equals `floor(now * 1e9)` nanoseconds after the epoch. The result is
    /// guaranteed to be representable as signed 64-bit nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Decode`] if `now` is NaN, infinite, or outside
    /// the range chrono can express in nanoseconds (roughly 1677..2262).
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        if !self.now.is_finite() {
            return Err(BridgeError::Decode(format!(
                "snapshot timestamp is not finite: {}",
                self.now
            )));
        }

        let nanos = (self.now * NANOS_PER_SECOND).floor();

        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        if nanos < i64::MIN as f64 || nanos >= i64::MAX as f64 {
            return Err(BridgeError::Decode(format!(
                "snapshot timestamp out of range: {}",
                self.now
            )));
        }

        Ok(Utc.timestamp_nanos(nanos as i64))
    }
}

/// One tracked aircraft
///
/// Unknown fields are retained in `extra` and survive a decode/encode round trip.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AircraftRecord {
    /// 24-bit ICAO address as hex, unique within a snapshot when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,

    /// Callsign, often space padded by the receiver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight: Option<String>,

    /// Latitude in degrees, kept in its original numeric form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Number>,

    /// Longitude in degrees, kept in its original numeric form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_baro: Option<Altitude>,

    /// Every other field, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AircraftRecord {
    /// ICAO address, empty when the receiver omitted it.
    pub fn hex(&self) -> &str {
        self.hex.as_deref().unwrap_or("")
    }

    pub fn latitude(&self) -> Option<f64> {
        self.lat.as_ref().and_then(Number::as_f64)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.lon.as_ref().and_then(Number::as_f64)
    }

    /// Callsign with receiver padding stripped.
    pub fn callsign(&self) -> Option<&str> {
        self.flight.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Re-encode the record as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encode`] if serialization fails.
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            BridgeError::Encode(format!("failed to encode aircraft {:?}: {}", self.hex(), e))
        })
    }
}

/// Barometric altitude as reported by dump1090
#[derive(Debug, Clone, PartialEq)]
pub enum Altitude {
    /// Aircraft reports it is on the ground
    OnGround,
    /// Altitude in feet, kept in its original numeric form
    Feet(Number),
}

impl Altitude {
    /// Returns true for the `"ground"` variant.
    pub fn is_on_ground(&self) -> bool {
        matches!(self, Altitude::OnGround)
    }

    /// Altitude in feet, `None` when on the ground.
    pub fn feet(&self) -> Option<f64> {
        match self {
            Altitude::OnGround => None,
            Altitude::Feet(n) => n.as_f64(),
        }
    }
}

impl Serialize for Altitude {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Altitude::OnGround => serializer.serialize_str(ALT_BARO_GROUND),
            Altitude::Feet(n) => n.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Altitude {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s == ALT_BARO_GROUND => Ok(Altitude::OnGround),
            Value::Number(n) => Ok(Altitude::Feet(n)),
            other => Err(D::Error::custom(format!(
                "alt_baro must be a number or \"{}\", got {}",
                ALT_BARO_GROUND, other
            ))),
        }
    }
}
