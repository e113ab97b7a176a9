//! # ADS-B Source Module
//!
//! Pull side of the bridge: the dump1090 `aircraft.json` endpoint.
//!
//! This module handles:
//! - Decoding aircraft snapshots (open records, tagged barometric altitude)
//! - Fetching one snapshot per cycle over HTTP with a bounded timeout

pub mod fetcher;
pub mod model;

pub use fetcher::SourceFetcher;
pub use model::{AircraftRecord, AircraftSnapshot, Altitude};
