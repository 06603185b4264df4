//! Test-log extraction from the rendered Pool Math page.
//!
//! The page lists test-log cards newest first, so only the first card in
//! document order matters. Each measurement on a card is a "chiclet" whose
//! child divs encode a (sensor type, value) pair through their class names.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Sentinel reported when a chiclet carries no recognizable value element.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Parse errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("No test log found")]
    NoTestLog,
}

/// One decoded chiclet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub sensor_type: String,
    pub value: String,
}

/// The most recent test-log card of one fetched document.
#[derive(Debug, Clone, Default)]
pub struct TestLog {
    /// Raw display text of the card's timestamp element, when present.
    pub tested_at: Option<String>,
    /// Decoded chiclets in document order.
    pub measurements: Vec<Measurement>,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(e.to_string()))
}

/// Locate the most recent test-log card and decode its chiclets.
///
/// The first `div.testLogCard` in document order is authoritative; older
/// cards further down the page are ignored. A document with no card at all
/// is an error, mirroring the not-ready condition at setup.
pub fn most_recent_test_log(html: &str) -> Result<TestLog, ParseError> {
    let document = Html::parse_document(html);

    let card_selector = selector("div.testLogCard")?;
    let card = document
        .select(&card_selector)
        .next()
        .ok_or(ParseError::NoTestLog)?;

    let timestamp_selector = selector("time.timestamp.timereal")?;
    let tested_at = card
        .select(&timestamp_selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let chiclet_selector = selector(".chiclet")?;
    let measurements = card.select(&chiclet_selector).map(decode_chiclet).collect();

    Ok(TestLog {
        tested_at,
        measurements,
    })
}

/// Text of the page's first h1, used to name an unnamed source.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let h1 = Selector::parse("h1").ok()?;

    document
        .select(&h1)
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty())
}

/// Decode one chiclet into a (sensor type, value) pair.
///
/// Child divs are walked in document order: the first div classed `bold`
/// contributes its text as the value, and every other div contributes its
/// class tokens, concatenated in order, to the sensor-type key. A chiclet
/// with no `bold` div reports the value as "unknown".
fn decode_chiclet(chiclet: ElementRef) -> Measurement {
    let mut value: Option<String> = None;
    let mut key = String::new();

    for child in chiclet.children().filter_map(ElementRef::wrap) {
        if child.value().name() != "div" {
            continue;
        }

        if child.value().classes().any(|class| class == "bold") {
            // First value element in document order wins
            if value.is_none() {
                value = Some(element_text(child));
            }
        } else {
            for class in child.value().classes() {
                key.push_str(class);
            }
        }
    }

    let measurement = Measurement {
        sensor_type: if key.is_empty() {
            UNKNOWN_VALUE.to_string()
        } else {
            key
        },
        value: value.unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
    };

    debug!(
        "Decoded chiclet: '{}' = {}",
        measurement.sensor_type, measurement.value
    );
    measurement
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(inner: &str) -> String {
        format!(r#"<html><body><div class="testLogCard">{}</div></body></html>"#, inner)
    }

    #[test]
    fn test_decodes_value_and_type_from_chiclet() {
        for key in ["fc", "ph", "ta", "ch", "cya", "salt", "borate"] {
            let html = card(&format!(
                r#"<div class="chiclet"><div class="{}">label</div><div class="bold">7.5</div></div>"#,
                key
            ));

            let log = most_recent_test_log(&html).unwrap();
            assert_eq!(log.measurements.len(), 1);
            assert_eq!(log.measurements[0].sensor_type, key);
            assert_eq!(log.measurements[0].value, "7.5");
        }
    }

    #[test]
    fn test_chiclet_without_value_element_reports_unknown() {
        let html = card(r#"<div class="chiclet"><div class="fc">FC</div></div>"#);

        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.measurements[0].sensor_type, "fc");
        assert_eq!(log.measurements[0].value, UNKNOWN_VALUE);
    }

    #[test]
    fn test_type_key_concatenates_markers_in_document_order() {
        // Two marker divs and a multi-class marker both contribute tokens,
        // in the order they appear.
        let html = card(
            r#"<div class="chiclet"><div class="f"></div><div class="c"></div><div class="bold">3.5</div></div>"#,
        );

        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.measurements[0].sensor_type, "fc");
        assert_eq!(log.measurements[0].value, "3.5");

        let html = card(r#"<div class="chiclet"><div class="cy a"></div><div class="bold">40</div></div>"#);
        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.measurements[0].sensor_type, "cya");
    }

    #[test]
    fn test_first_value_element_wins() {
        let html = card(
            r#"<div class="chiclet"><div class="ph">pH</div><div class="bold">7.6</div><div class="bold">9.9</div></div>"#,
        );

        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.measurements[0].sensor_type, "ph");
        assert_eq!(log.measurements[0].value, "7.6");
    }

    #[test]
    fn test_non_div_children_are_ignored() {
        let html = card(
            r#"<div class="chiclet"><span class="junk">x</span><div class="salt">Salt</div><div class="bold">3200</div></div>"#,
        );

        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.measurements[0].sensor_type, "salt");
        assert_eq!(log.measurements[0].value, "3200");
    }

    #[test]
    fn test_only_first_card_is_read() {
        let html = r#"<html><body>
            <div class="testLogCard"><div class="chiclet"><div class="fc"></div><div class="bold">3.5</div></div></div>
            <div class="testLogCard"><div class="chiclet"><div class="fc"></div><div class="bold">9.0</div></div></div>
            </body></html>"#;

        let log = most_recent_test_log(html).unwrap();
        assert_eq!(log.measurements.len(), 1);
        assert_eq!(log.measurements[0].value, "3.5");
    }

    #[test]
    fn test_timestamp_is_captured_from_card() {
        let html = card(
            r#"<time class="timestamp timereal">Jul 4, 2019 2:30 PM</time>
            <div class="chiclet"><div class="ph"></div><div class="bold">7.6</div></div>"#,
        );

        let log = most_recent_test_log(&html).unwrap();
        assert_eq!(log.tested_at.as_deref(), Some("Jul 4, 2019 2:30 PM"));
    }

    #[test]
    fn test_document_without_card_is_no_test_log() {
        let result = most_recent_test_log("<html><body><p>nothing here</p></body></html>");
        assert!(matches!(result, Err(ParseError::NoTestLog)));
    }

    #[test]
    fn test_card_without_chiclets_yields_empty_log() {
        let html = card(r#"<time class="timestamp timereal">today</time>"#);

        let log = most_recent_test_log(&html).unwrap();
        assert!(log.measurements.is_empty());
        assert_eq!(log.tested_at.as_deref(), Some("today"));
    }

    #[test]
    fn test_page_title_from_first_h1() {
        let html = r#"<html><body><h1> Smith Family Pool </h1><h1>Other</h1></body></html>"#;
        assert_eq!(page_title(html).as_deref(), Some("Smith Family Pool"));

        assert_eq!(page_title("<html><body></body></html>"), None);
        assert_eq!(page_title("<html><body><h1>  </h1></body></html>"), None);
    }
}
