//! Sensor catalog and reading holders for Pool Math chemistries.
//!
//! The set of chemistries Pool Math reports is closed and known up front;
//! keys scraped from the page that fall outside it are logged and dropped
//! rather than admitted as ad-hoc sensors.

use std::sync::{RwLock, Weak};

use crate::client::{ClientInner, RefreshError};

/// One known Pool Math chemistry, keyed the way the page styles its
/// chiclets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Fc,
    Ph,
    Ta,
    Ch,
    Cya,
    Salt,
    Borate,
}

/// Display metadata for one chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDefinition {
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

/// TFP recommended level for one chemistry. Reference data only;
/// extraction never range-checks values against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
    pub target: Option<f64>,
}

impl SensorKind {
    pub const ALL: [SensorKind; 7] = [
        SensorKind::Fc,
        SensorKind::Ph,
        SensorKind::Ta,
        SensorKind::Ch,
        SensorKind::Cya,
        SensorKind::Salt,
        SensorKind::Borate,
    ];

    /// Resolve a scraped sensor-type key. Keys outside the known set are
    /// rejected here and dropped by the caller.
    pub fn from_key(key: &str) -> Option<SensorKind> {
        match key {
            "fc" => Some(SensorKind::Fc),
            "ph" => Some(SensorKind::Ph),
            "ta" => Some(SensorKind::Ta),
            "ch" => Some(SensorKind::Ch),
            "cya" => Some(SensorKind::Cya),
            "salt" => Some(SensorKind::Salt),
            "borate" => Some(SensorKind::Borate),
            _ => None,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            SensorKind::Fc => "fc",
            SensorKind::Ph => "ph",
            SensorKind::Ta => "ta",
            SensorKind::Ch => "ch",
            SensorKind::Cya => "cya",
            SensorKind::Salt => "salt",
            SensorKind::Borate => "borate",
        }
    }

    /// Display name, unit and description for this chemistry.
    /// See https://www.troublefreepool.com/blog/2018/12/12/abcs-of-pool-water-chemistry/
    pub const fn definition(self) -> SensorDefinition {
        match self {
            SensorKind::Fc => SensorDefinition {
                name: "FC",
                unit: "mg/L",
                description: "Free Chlorine",
            },
            SensorKind::Ph => SensorDefinition {
                name: "pH",
                unit: "pH",
                description: "Acidity/Basicity",
            },
            SensorKind::Ta => SensorDefinition {
                name: "TA",
                unit: "ppm",
                description: "Total Alkalinity",
            },
            SensorKind::Ch => SensorDefinition {
                name: "CH",
                unit: "ppm",
                description: "Calcium Hardness",
            },
            SensorKind::Cya => SensorDefinition {
                name: "CYA",
                unit: "ppm",
                description: "Cyanuric Acid",
            },
            SensorKind::Salt => SensorDefinition {
                name: "Salt",
                unit: "ppm",
                description: "Salt",
            },
            SensorKind::Borate => SensorDefinition {
                name: "Borate",
                unit: "ppm",
                description: "Borate",
            },
        }
    }

    /// TFP recommended target levels.
    pub const fn target_range(self) -> TargetRange {
        match self {
            // depends on CYA
            SensorKind::Fc => TargetRange {
                min: 0.0,
                max: 0.0,
                target: None,
            },
            SensorKind::Ph => TargetRange {
                min: 7.2,
                max: 7.8,
                target: Some(7.7),
            },
            SensorKind::Ta => TargetRange {
                min: 0.0,
                max: 0.0,
                target: None,
            },
            // with salt: 350-450 ppm
            SensorKind::Ch => TargetRange {
                min: 250.0,
                max: 350.0,
                target: None,
            },
            // with salt: 70-80 ppm
            SensorKind::Cya => TargetRange {
                min: 30.0,
                max: 50.0,
                target: None,
            },
            SensorKind::Salt => TargetRange {
                min: 2000.0,
                max: 3000.0,
                target: None,
            },
            SensorKind::Borate => TargetRange {
                min: 30.0,
                max: 50.0,
                target: None,
            },
        }
    }
}

/// A single chemistry reading whose value is kept up to date by its source.
///
/// Created once when its sensor type is first seen during extraction; only
/// the value changes afterwards. The owning client holds the authoritative
/// `Arc`; hosts keep clones and read the current value on demand.
#[derive(Debug)]
pub struct Reading {
    name: String,
    unit: &'static str,
    value: RwLock<Option<String>>,
    source: Weak<ClientInner>,
}

impl Reading {
    pub(crate) fn new(name: String, unit: &'static str, source: Weak<ClientInner>) -> Self {
        Self {
            name,
            unit,
            value: RwLock::new(None),
            source,
        }
    }

    /// Name of the reading, source name plus chemistry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit the value is expressed in.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// Current value; `None` until the first extraction sees this sensor.
    pub fn value(&self) -> Option<String> {
        self.value.read().unwrap().clone()
    }

    /// Overwrite the current value. No validation, no range checking.
    pub(crate) fn inject_value(&self, value: String) {
        *self.value.write().unwrap() = Some(value);
    }

    /// Ask the owning source to refresh. All readings scraped from the same
    /// page are updated by the single re-fetch. A reading whose source has
    /// been dropped is left as-is.
    pub fn refresh(&self) -> Result<(), RefreshError> {
        match self.source.upgrade() {
            Some(inner) => ClientInner::refresh(&inner).map(|_| ()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key_round_trips_all_kinds() {
        for kind in SensorKind::ALL {
            assert_eq!(SensorKind::from_key(kind.key()), Some(kind));
        }
    }

    #[test]
    fn test_from_key_rejects_unknown() {
        assert_eq!(SensorKind::from_key("orp"), None);
        assert_eq!(SensorKind::from_key(""), None);
        assert_eq!(SensorKind::from_key("FC"), None);
    }

    #[test]
    fn test_definitions_match_pool_math_table() {
        let fc = SensorKind::Fc.definition();
        assert_eq!(fc.name, "FC");
        assert_eq!(fc.unit, "mg/L");
        assert_eq!(fc.description, "Free Chlorine");

        let ph = SensorKind::Ph.definition();
        assert_eq!(ph.name, "pH");
        assert_eq!(ph.unit, "pH");

        assert_eq!(SensorKind::Salt.definition().unit, "ppm");
    }

    #[test]
    fn test_target_ranges_match_tfp_table() {
        let ph = SensorKind::Ph.target_range();
        assert_eq!(ph.min, 7.2);
        assert_eq!(ph.max, 7.8);
        assert_eq!(ph.target, Some(7.7));

        let salt = SensorKind::Salt.target_range();
        assert_eq!(salt.min, 2000.0);
        assert_eq!(salt.max, 3000.0);
        assert_eq!(salt.target, None);
    }

    #[test]
    fn test_reading_starts_empty_and_takes_injected_value() {
        let reading = Reading::new("Pool Math FC".to_string(), "mg/L", Weak::new());

        assert_eq!(reading.value(), None);

        reading.inject_value("3.5".to_string());
        assert_eq!(reading.value(), Some("3.5".to_string()));

        // Overwrite in place, no validation
        reading.inject_value("not a number".to_string());
        assert_eq!(reading.value(), Some("not a number".to_string()));
    }

    #[test]
    fn test_reading_refresh_with_dead_source_is_noop() {
        let reading = Reading::new("Pool Math pH".to_string(), "pH", Weak::new());
        reading.inject_value("7.6".to_string());

        assert!(reading.refresh().is_ok());
        assert_eq!(reading.value(), Some("7.6".to_string()));
    }
}
