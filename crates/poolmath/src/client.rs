//! Pool Math client.
//!
//! Fetches the configured share page, extracts the most recent test log,
//! and keeps one `Reading` per discovered chemistry up to date. Discovery
//! is reported back to the caller: `refresh` returns the readings created
//! during that pass so the host can register them with its own registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{PoolMathConfig, DEFAULT_NAME};
use crate::fetch::{Document, FetchError, Fetcher, HttpFetcher};
use crate::parse::{self, ParseError};
use crate::sensor::{Reading, SensorKind};

/// Fatal construction errors. A source that never loads is never created.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InitError {
    #[error("Initial fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] RefreshError),
}

/// Errors from re-extraction after a successful fetch. Fetch failures are
/// not represented here: they are recovered locally by keeping prior state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("No test log found at {0}")]
    NoTestLog(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Default)]
struct ClientState {
    readings: HashMap<SensorKind, Arc<Reading>>,
    tested_at: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

pub(crate) struct ClientInner {
    name: String,
    url: String,
    fetcher: Box<dyn Fetcher>,
    state: Mutex<ClientState>,
}

/// Scrapes one Pool Math page and owns the readings extracted from it.
pub struct PoolMathClient {
    inner: Arc<ClientInner>,
}

impl PoolMathClient {
    /// Build a client over the given fetcher. The initial fetch and
    /// extraction run here and are fatal on failure.
    pub fn new(config: &PoolMathConfig, fetcher: impl Fetcher + 'static) -> Result<Self, InitError> {
        let document = fetcher.fetch()?;

        let name = match &config.name {
            Some(name) => name.clone(),
            None => match parse::page_title(&document.body) {
                Some(title) => {
                    info!("Loaded Pool Math data for '{}'", title);
                    format!("{} {}", DEFAULT_NAME, title)
                }
                None => DEFAULT_NAME.to_string(),
            },
        };

        let inner = Arc::new(ClientInner {
            name,
            url: config.url.clone(),
            fetcher: Box::new(fetcher),
            state: Mutex::new(ClientState::default()),
        });

        ClientInner::extract(&inner, &document)?;

        info!("Created Pool Math source: {}", inner.name);
        Ok(Self { inner })
    }

    /// Build a client with a real HTTP fetcher wired from configuration.
    pub fn with_http(config: &PoolMathConfig) -> Result<Self, InitError> {
        let fetcher = HttpFetcher::new(&config.url, config.credentials(), config.timeout_secs)?;
        Self::new(config, fetcher)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Re-fetch the page and re-run extraction. Readings created during
    /// this pass are returned for the host to register. A failed fetch is
    /// logged and leaves every reading untouched.
    pub fn refresh(&self) -> Result<Vec<Arc<Reading>>, RefreshError> {
        ClientInner::refresh(&self.inner)
    }

    /// Every reading discovered so far, in catalog order.
    pub fn readings(&self) -> Vec<Arc<Reading>> {
        let state = self.inner.state.lock().unwrap();
        SensorKind::ALL
            .iter()
            .filter_map(|kind| state.readings.get(kind).cloned())
            .collect()
    }

    /// The reading for one chemistry, if the page has ever reported it.
    pub fn reading(&self, kind: SensorKind) -> Option<Arc<Reading>> {
        self.inner.state.lock().unwrap().readings.get(&kind).cloned()
    }

    /// Timestamp text of the most recent test log, as displayed on the page.
    pub fn last_tested_at(&self) -> Option<String> {
        self.inner.state.lock().unwrap().tested_at.clone()
    }

    /// When the currently held document was fetched.
    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().unwrap().fetched_at
    }
}

impl ClientInner {
    pub(crate) fn refresh(inner: &Arc<Self>) -> Result<Vec<Arc<Reading>>, RefreshError> {
        let document = match inner.fetcher.fetch() {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Failed to update Pool Math data for '{}' from {}: {}",
                    inner.name, inner.url, e
                );
                return Ok(vec![]);
            }
        };

        Self::extract(inner, &document)
    }

    /// Re-run extraction over a freshly fetched document, creating readings
    /// on first sight of a sensor type and updating values otherwise.
    fn extract(inner: &Arc<Self>, document: &Document) -> Result<Vec<Arc<Reading>>, RefreshError> {
        let log = match parse::most_recent_test_log(&document.body) {
            Ok(log) => log,
            Err(ParseError::NoTestLog) => {
                info!("Couldn't find any test logs at {}", inner.url);
                return Err(RefreshError::NoTestLog(inner.url.clone()));
            }
            Err(e) => return Err(RefreshError::Parse(e.to_string())),
        };

        debug!(
            "Most recent test log at {}: {:?} ({} entries)",
            inner.url,
            log.tested_at,
            log.measurements.len()
        );

        let mut state = inner.state.lock().unwrap();
        state.tested_at = log.tested_at;
        state.fetched_at = Some(document.fetched_at);

        let mut new_readings = Vec::new();
        for measurement in &log.measurements {
            let kind = match SensorKind::from_key(&measurement.sensor_type) {
                Some(kind) => kind,
                None => {
                    info!(
                        "Unknown Pool Math sensor '{}' discovered at {}",
                        measurement.sensor_type, inner.url
                    );
                    continue;
                }
            };

            let (reading, created) = Self::get_or_create_reading(inner, &mut state, kind);
            if created {
                new_readings.push(Arc::clone(&reading));
            }

            reading.inject_value(measurement.value.clone());
        }

        Ok(new_readings)
    }

    /// Resolve the reading for a sensor kind, creating and recording it on
    /// first sight. The flag reports whether this call created it.
    fn get_or_create_reading(
        inner: &Arc<Self>,
        state: &mut ClientState,
        kind: SensorKind,
    ) -> (Arc<Reading>, bool) {
        if let Some(reading) = state.readings.get(&kind) {
            return (Arc::clone(reading), false);
        }

        let definition = kind.definition();
        let reading = Arc::new(Reading::new(
            format!("{} {}", inner.name, definition.name),
            definition.unit,
            Arc::downgrade(inner),
        ));
        state.readings.insert(kind, Arc::clone(&reading));

        debug!("Created Pool Math reading: {}", reading.name());
        (reading, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FakeFetcher;

    const PAGE: &str = r#"<html><body>
        <div class="testLogCard">
        <time class="timestamp timereal">Jul 4, 2019 2:30 PM</time>
        <div class="chiclet"><div class="fc">FC</div><div class="bold">3.5</div></div>
        </div></body></html>"#;

    #[test]
    fn test_name_defaults_without_title() {
        let config = PoolMathConfig::new("https://example.com/pool");
        let client = PoolMathClient::new(&config, FakeFetcher::always(PAGE)).unwrap();

        assert_eq!(client.name(), DEFAULT_NAME);
    }

    #[test]
    fn test_name_extends_default_with_page_title() {
        let page = format!("<h1>Smith Family Pool</h1>{}", PAGE);
        let config = PoolMathConfig::new("https://example.com/pool");
        let client = PoolMathClient::new(&config, FakeFetcher::always(&page)).unwrap();

        assert_eq!(client.name(), "Pool Math Smith Family Pool");
        assert_eq!(
            client.reading(SensorKind::Fc).unwrap().name(),
            "Pool Math Smith Family Pool FC"
        );
    }

    #[test]
    fn test_configured_name_is_used_verbatim() {
        let page = format!("<h1>Ignored Title</h1>{}", PAGE);
        let mut config = PoolMathConfig::new("https://example.com/pool");
        config.name = Some("Backyard".to_string());

        let client = PoolMathClient::new(&config, FakeFetcher::always(&page)).unwrap();
        assert_eq!(client.name(), "Backyard");
        assert_eq!(
            client.reading(SensorKind::Fc).unwrap().name(),
            "Backyard FC"
        );
    }

    #[test]
    fn test_get_or_create_returns_same_reading_across_refreshes() {
        let config = PoolMathConfig::new("https://example.com/pool");
        let client = PoolMathClient::new(&config, FakeFetcher::always(PAGE)).unwrap();

        let first = client.reading(SensorKind::Fc).unwrap();

        // Same page again: no new readings, identical instance
        let new_readings = client.refresh().unwrap();
        assert!(new_readings.is_empty());
        assert!(Arc::ptr_eq(&first, &client.reading(SensorKind::Fc).unwrap()));
    }

    #[test]
    fn test_last_tested_at_tracks_card_timestamp() {
        let config = PoolMathConfig::new("https://example.com/pool");
        let client = PoolMathClient::new(&config, FakeFetcher::always(PAGE)).unwrap();

        assert_eq!(client.last_tested_at().as_deref(), Some("Jul 4, 2019 2:30 PM"));
        assert!(client.last_fetched_at().is_some());
    }
}
