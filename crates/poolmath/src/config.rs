//! Configuration for a Pool Math source.
//!
//! Loaded from a TOML file or assembled from CLI flags; only the page URL
//! is required.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fetch::BasicCredentials;

/// Default source name when none is configured. Extended with the page
/// title when one is found.
pub const DEFAULT_NAME: &str = "Pool Math";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolMathConfig {
    /// Share URL of the Pool Math page to scrape.
    pub url: String,

    /// Source name. Readings are named "<source name> <chemistry>".
    #[serde(default)]
    pub name: Option<String>,

    /// Optional basic-auth username for the GET request.
    #[serde(default)]
    pub username: Option<String>,

    /// Optional basic-auth password.
    #[serde(default)]
    pub password: Option<String>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl PoolMathConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        info!("Loaded Pool Math config from {:?}", path);
        Ok(config)
    }

    /// Basic-auth credentials, when a username is configured.
    pub fn credentials(&self) -> Option<BasicCredentials> {
        self.username.as_ref().map(|username| BasicCredentials {
            username: username.clone(),
            password: self.password.clone(),
        })
    }
}
