//! Secure PDF proxy.
//!
//! Re-serves remote documents so browsers can render them inline. Targets
//! given by URL pass a [`HostAllowlist`] first; the proxy must never become
//! an open relay. Origin headers are discarded and replaced with a fixed set
//! (see [`PdfDocument::headers`]). Payloads are buffered whole.

mod allowlist;

pub use allowlist::{DEFAULT_LOOPBACK_HOST, DEFAULT_TRUSTED_SUFFIX, HostAllowlist};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::remote::{FetchError, PageFetcher};

/// Filename used when the caller supplies none.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// Errors from the proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing url parameter")]
    MissingUrl,

    #[error("Proxying host '{host}' is not allowed")]
    Forbidden { host: String },

    #[error("Proxying this target is not allowed: {0}")]
    InvalidTarget(String),

    #[error("Failed to fetch remote PDF: HTTP {status}")]
    Upstream { url: String, status: u16 },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Caching behavior of a proxied response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Arbitrary URLs that may change.
    NoStore,
    /// Content addressed by a stable identifier.
    Immutable,
}

/// A buffered PDF ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub body: Vec<u8>,
    /// Already sanitized.
    pub filename: String,
    pub cache: CachePolicy,
}

impl PdfDocument {
    /// Response headers, independent of anything the origin sent.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("content-type", "application/pdf".to_string()),
            (
                "content-disposition",
                format!("inline; filename=\"{}\"", self.filename),
            ),
            ("access-control-allow-origin", "*".to_string()),
            ("access-control-allow-methods", "GET, OPTIONS".to_string()),
            ("access-control-allow-headers", "Content-Type".to_string()),
        ];
        match self.cache {
            CachePolicy::NoStore => headers.extend([
                (
                    "cache-control",
                    "no-cache, no-store, must-revalidate".to_string(),
                ),
                ("pragma", "no-cache".to_string()),
                ("expires", "0".to_string()),
            ]),
            CachePolicy::Immutable => {
                headers.push(("cache-control", "public, max-age=31536000".to_string()));
            }
        }
        headers
    }
}

/// Strips quote and control characters from a caller-supplied filename.
/// Empty results fall back to [`DEFAULT_FILENAME`].
#[must_use]
pub fn sanitize_filename(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Allowlisted fetch-and-rewrap of remote PDFs.
#[derive(Clone)]
pub struct SecureProxy {
    fetcher: Arc<dyn PageFetcher>,
    allowlist: HostAllowlist,
}

impl SecureProxy {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, allowlist: HostAllowlist) -> Self {
        Self { fetcher, allowlist }
    }

    /// Proxies an arbitrary URL after the allowlist check. The response is
    /// marked no-store.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::MissingUrl`] when `target` is absent or blank
    /// - [`ProxyError::Forbidden`] / [`ProxyError::InvalidTarget`] when the
    ///   allowlist rejects it; no fetch is attempted
    /// - [`ProxyError::Upstream`] / [`ProxyError::Fetch`] when the fetch fails
    #[instrument(skip(self))]
    pub async fn fetch_pdf(
        &self,
        target: Option<&str>,
        filename: Option<&str>,
    ) -> Result<PdfDocument, ProxyError> {
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ProxyError::MissingUrl)?;

        let url = self.allowlist.check(target).inspect_err(|error| {
            warn!(url = target, error = %error, "proxy target rejected");
        })?;

        let body = self.fetch_body(url.as_str()).await?;
        Ok(PdfDocument {
            body,
            filename: sanitize_filename(filename),
            cache: CachePolicy::NoStore,
        })
    }

    /// Proxies a URL that came from our own records, skipping the allowlist.
    /// The response is marked immutable.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Upstream`] / [`ProxyError::Fetch`] when the
    /// fetch fails.
    #[instrument(skip(self))]
    pub async fn fetch_trusted(
        &self,
        url: &str,
        filename: Option<&str>,
    ) -> Result<PdfDocument, ProxyError> {
        let body = self.fetch_body(url).await?;
        Ok(PdfDocument {
            body,
            filename: sanitize_filename(filename),
            cache: CachePolicy::Immutable,
        })
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>, ProxyError> {
        let page = self.fetcher.fetch(url).await?;
        if !page.is_success() {
            warn!(url, status = page.status, "proxy origin returned an error status");
            return Err(ProxyError::Upstream {
                url: url.to_string(),
                status: page.status,
            });
        }
        info!(
            url,
            bytes = page.body.len(),
            origin_type = page.content_type.as_deref().unwrap_or("unknown"),
            "proxying document"
        );
        Ok(page.body)
    }
}
