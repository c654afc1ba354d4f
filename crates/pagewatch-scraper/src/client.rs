//! HTTP client for fetching monitored pages.

use std::time::Duration;

use reqwest::{redirect::Policy, Client};

use crate::error::ScraperError;

const MAX_REDIRECTS: usize = 10;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fetches a single page as HTML. No retries: a failed fetch is recorded as
/// a `failed` observation and the user can simply check again.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: Client,
    timeout_secs: u64,
}

impl PageClient {
    /// Creates a `PageClient` with a total request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs)))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Fetches `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] for any non-2xx final status.
    /// - [`ScraperError::Timeout`] when the request exceeds the configured timeout.
    /// - [`ScraperError::Http`] for DNS, TLS, connection, or body decoding failures.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "page fetch returned non-success status");
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        response.text().await.map_err(|e| self.classify(url, e))
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> ScraperError {
        if err.is_timeout() {
            ScraperError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ScraperError::Http(err)
        }
    }
}
