//! Remote page fetching.
//!
//! A [`PageFetcher`] performs a single outbound GET with the service's
//! identifying User-Agent and hands back the status and raw payload. It never
//! retries, and it never turns a non-2xx status into an error: callers decide
//! what a 404 or 500 means for their operation.
//!
//! - [`PageFetcher`] - Async trait used by the debate catalog and secure proxy
//! - [`HttpPageFetcher`] - `reqwest`-backed implementation
//! - [`FetchedPage`] - Status, final URL and buffered body

mod error;
mod http_client;

pub use error::FetchError;
pub use http_client::{FetcherOptions, HttpPageFetcher};

use std::borrow::Cow;

use async_trait::async_trait;

/// A fully buffered response from a remote origin.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// HTTP status code returned by the origin.
    pub status: u16,
    /// Content-Type reported by the origin, if any.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Performs single-attempt outbound fetches.
///
/// This trait uses `async_trait` so catalog and proxy can hold an
/// `Arc<dyn PageFetcher>` and tests can substitute a recording double.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` once.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only when no response was obtained (invalid
    /// URL, connection failure, timeout). Non-2xx responses are returned as
    /// `Ok` with the status set.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16, body: &[u8]) -> FetchedPage {
        FetchedPage {
            url: "https://filhaal.vercel.app/debates".to_string(),
            status,
            content_type: None,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_fetched_page_success_range() {
        assert!(page(200, b"").is_success());
        assert!(page(204, b"").is_success());
        assert!(!page(301, b"").is_success());
        assert!(!page(404, b"").is_success());
        assert!(!page(502, b"").is_success());
    }

    #[test]
    fn test_fetched_page_text_is_lossy() {
        let fetched = page(200, b"<p>ok\xff</p>");
        assert!(fetched.text().starts_with("<p>ok"));
    }
}
