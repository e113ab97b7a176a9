//! # adsb2loki Library
//!
//! Forward ADS-B aircraft snapshots from a dump1090 receiver to Grafana Loki.
//!
//! This library provides the fetch → transform → push pipeline that polls a
//! receiver's `aircraft.json`, turns every tracked aircraft into a log line,
//! and pushes the batch to Loki's HTTP push API.

pub mod adsb;
pub mod bridge;
pub mod config;
pub mod error;
pub mod loki;
pub mod pipeline;
pub mod telemetry;
pub mod transport;
