//! Document retrieval for the Pool Math page.
//!
//! One HTTP GET per refresh cycle, no retry or backoff. The `Fetcher` trait
//! is the seam that lets tests script responses without a network.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Raw page content from one fetch cycle. Replaced wholesale on every
/// refresh, never merged.
#[derive(Debug, Clone)]
pub struct Document {
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Fetch errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Empty response body from {0}")]
    EmptyBody(String),
}

/// Optional basic-auth credentials for the GET request.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: Option<String>,
}

/// Retrieves the current document for one source.
pub trait Fetcher: Send + Sync {
    /// Fetch the document. A response with no content is an error.
    fn fetch(&self) -> Result<Document, FetchError>;
}

/// Real fetcher issuing a blocking GET against a fixed URL.
pub struct HttpFetcher {
    url: String,
    credentials: Option<BasicCredentials>,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(
        url: impl Into<String>,
        credentials: Option<BasicCredentials>,
        timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("poolmathd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            credentials,
            client,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self) -> Result<Document, FetchError> {
        let mut request = self.client.get(&self.url);

        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, creds.password.as_deref());
        }

        let response = request
            .send()
            .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Http(format!("Failed to read body: {}", e)))?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(self.url.clone()));
        }

        Ok(Document::new(body))
    }
}

/// Scripted fetcher for tests.
pub struct FakeFetcher {
    responses: Mutex<Vec<Result<Document, FetchError>>>,
    call_count: Mutex<usize>,
}

impl FakeFetcher {
    /// Create a fake fetcher with pre-defined responses. The last response
    /// repeats once the script runs out.
    pub fn new(responses: Vec<Result<Document, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    /// Create a fake fetcher that always returns the same page.
    pub fn always(body: &str) -> Self {
        Self::new(vec![Ok(Document::new(body))])
    }

    /// Create a fake fetcher that always fails.
    pub fn always_error(error: FetchError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Get the number of fetches made
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self) -> Result<Document, FetchError> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(FetchError::EmptyBody("fake".to_string()));
        }

        if responses.len() == 1 {
            // Keep returning the same response
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}
