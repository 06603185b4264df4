//! Pool Math chemistry bridge.
//!
//! Scrapes a public Pool Math share page and exposes each measurement from
//! the most recent test log as a named, unit-tagged reading. Strictly
//! pull-based: every update is an externally triggered refresh that
//! re-fetches and re-parses the page.

pub mod client;
pub mod config;
pub mod fetch;
pub mod parse;
pub mod sensor;

pub use client::{InitError, PoolMathClient, RefreshError};
pub use config::{PoolMathConfig, DEFAULT_NAME};
pub use fetch::{Document, FetchError, Fetcher, HttpFetcher};
pub use sensor::{Reading, SensorDefinition, SensorKind, TargetRange};
