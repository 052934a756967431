//! `reqwest`-backed page fetcher.
//!
//! Centralizes outbound networking defaults so listing, detail, and proxy
//! fetches stay consistent on user-agent and compression. No timeout is set
//! unless one is configured explicitly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use crate::user_agent;

use super::{FetchError, FetchedPage, PageFetcher};

/// Construction options for [`HttpPageFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Optional whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            user_agent: user_agent::default_user_agent(),
            timeout: None,
        }
    }
}

/// HTTP fetcher shared by the catalog and the secure proxy.
///
/// Created once and reused so requests share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    /// Builds a fetcher with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] when client construction fails.
    pub fn new(options: &FetcherOptions) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.clone())
            .gzip(true);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::network(url, source))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::network(url, source))?;

        debug!(status, bytes = body.len(), "fetch complete");

        Ok(FetchedPage {
            url: url.to_string(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_have_no_timeout() {
        let options = FetcherOptions::default();
        assert!(options.timeout.is_none());
        assert!(options.user_agent.starts_with("filhaal-proxy/"));
    }

    #[test]
    fn test_fetch_rejects_invalid_url_without_network() {
        let fetcher = HttpPageFetcher::new(&FetcherOptions::default()).unwrap();
        let result = tokio_test::block_on(fetcher.fetch("not a url"));
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
