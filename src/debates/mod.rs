//! Debate document aggregation.
//!
//! Debates come from two places: the public debates site, scraped through a
//! [`PageFetcher`](crate::remote::PageFetcher), and PDFs uploaded by admins
//! and recorded in the local store. This module merges them into one listing,
//! resolves single documents, and records new uploads.
//!
//! # Identifiers
//!
//! Provenance travels as a [`DocumentId`]. Local records serialize as
//! `local-<n>`; everything else is an external id. The prefix is only ever
//! added here, never trusted from scraped markup.
//!
//! - [`DebateCatalog`] - listing and detail resolution
//! - [`DebateUploader`] - storage-then-insert uploads
//! - [`DebateSource`] - local record seam, implemented by [`DebateStore`]

mod catalog;
mod upload;

pub use catalog::DebateCatalog;
pub use upload::{DebateUpload, DebateUploader, is_pdf};

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::remote::FetchError;
use crate::storage::StorageError;
use crate::store::{self, DebateStore, LocalDebateRecord, NewDebate, StoreError};

/// Prefix marking locally stored debates in serialized ids.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Default public debates site.
pub const DEFAULT_SITE_URL: &str = "https://filhaal.vercel.app";

/// Errors from listing, resolving or uploading debates.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("missing id parameter")]
    MissingId,

    #[error("invalid local id: {0}")]
    InvalidId(String),

    #[error("debate not found: {0}")]
    NotFound(String),

    /// The debates site answered with a non-2xx status.
    #[error("failed to fetch source page {url}: HTTP {status}")]
    Upstream {
        /// Page that was requested.
        url: String,
        /// Status it answered with.
        status: u16,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to read or write local debates: {0}")]
    Persistence(#[from] StoreError),

    #[error("{0}")]
    InvalidUpload(String),

    #[error("failed to store uploaded document: {0}")]
    Storage(#[from] StorageError),
}

/// Typed provenance of a debate document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    /// Primary key of a locally uploaded record.
    Local(i64),
    /// Opaque id taken from the debates site.
    External(String),
}

impl DocumentId {
    /// Parses an id received at the HTTP boundary.
    ///
    /// # Errors
    ///
    /// Returns [`DebateError::MissingId`] for an empty string and
    /// [`DebateError::InvalidId`] when a `local-` id has no numeric suffix.
    pub fn parse(raw: &str) -> Result<Self, DebateError> {
        if raw.is_empty() {
            return Err(DebateError::MissingId);
        }
        let Some(suffix) = raw.strip_prefix(LOCAL_ID_PREFIX) else {
            return Ok(Self::External(raw.to_string()));
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DebateError::InvalidId(raw.to_string()));
        }
        suffix
            .parse()
            .map(Self::Local)
            .map_err(|_| DebateError::InvalidId(raw.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "{LOCAL_ID_PREFIX}{id}"),
            Self::External(id) => f.write_str(id),
        }
    }
}

/// Client-facing description of a debate document.
///
/// Absent values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    pub id: String,
    pub title: String,
    pub document_url: Option<String>,
    pub source_url: Option<String>,
    pub description: Option<String>,
}

impl DocumentDescriptor {
    /// Descriptor for a local record, fields taken verbatim. A missing name
    /// becomes an empty title.
    #[must_use]
    pub fn from_local(record: &LocalDebateRecord) -> Self {
        Self {
            id: DocumentId::Local(record.id).to_string(),
            title: record.name.clone().unwrap_or_default(),
            document_url: Some(record.pdf_url.clone()),
            source_url: None,
            description: record.description.clone(),
        }
    }
}

/// Where the debates site lives and how its pages are addressed.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    base: Url,
    listing_path: String,
    detail_prefix: String,
}

impl SiteConfig {
    /// Site rooted at `base` with the `/debates` listing and
    /// `/debates/<id>` detail pages.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base,
            listing_path: "/debates".to_string(),
            detail_prefix: "/debates/".to_string(),
        }
    }

    /// Listing page URL.
    #[must_use]
    pub fn listing_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path(&self.listing_path);
        url
    }

    /// Path prefix that listing anchors must start with.
    #[must_use]
    pub fn detail_prefix(&self) -> &str {
        &self.detail_prefix
    }

    /// Detail page URL for an external id, path-encoded.
    #[must_use]
    pub fn detail_url(&self, id: &str) -> String {
        format!(
            "{}{}{}",
            self.base.origin().ascii_serialization(),
            self.detail_prefix,
            urlencoding::encode(id)
        )
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        let base = Url::parse(DEFAULT_SITE_URL)
            .unwrap_or_else(|e| panic!("invalid default site url '{DEFAULT_SITE_URL}': {e}"));
        Self::new(base)
    }
}

/// Local debate record access used by the catalog and uploader.
///
/// This keeps catalog logic independent of the concrete store so tests can
/// substitute failing or counting doubles.
#[async_trait]
pub trait DebateSource: Send + Sync {
    /// All local records, newest first.
    async fn newest_first(&self) -> store::Result<Vec<LocalDebateRecord>>;

    /// A local record by primary key.
    async fn find(&self, id: i64) -> store::Result<Option<LocalDebateRecord>>;

    /// Inserts a new record.
    async fn insert(&self, debate: &NewDebate) -> store::Result<LocalDebateRecord>;
}

#[async_trait]
impl DebateSource for DebateStore {
    async fn newest_first(&self) -> store::Result<Vec<LocalDebateRecord>> {
        self.list_newest_first().await
    }

    async fn find(&self, id: i64) -> store::Result<Option<LocalDebateRecord>> {
        DebateStore::find(self, id).await
    }

    async fn insert(&self, debate: &NewDebate) -> store::Result<LocalDebateRecord> {
        DebateStore::insert(self, debate).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_parse_local_id() {
        assert_eq!(DocumentId::parse("local-7").unwrap(), DocumentId::Local(7));
    }

    #[test]
    fn test_parse_external_id() {
        assert_eq!(
            DocumentId::parse("censorship").unwrap(),
            DocumentId::External("censorship".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric_local_suffix() {
        for raw in ["local-abc", "local-", "local-7x", "local--1", "local-99999999999999999999"] {
            assert!(
                matches!(DocumentId::parse(raw), Err(DebateError::InvalidId(_))),
                "{raw} should be invalid"
            );
        }
    }

    #[test]
    fn test_parse_empty_is_missing() {
        assert!(matches!(DocumentId::parse(""), Err(DebateError::MissingId)));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for id in [DocumentId::Local(42), DocumentId::External("a b".to_string())] {
            assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
        }
    }

    #[test]
    fn test_site_urls() {
        let site = SiteConfig::default();
        assert_eq!(
            site.listing_url().as_str(),
            "https://filhaal.vercel.app/debates"
        );
        assert_eq!(
            site.detail_url("free speech/2"),
            "https://filhaal.vercel.app/debates/free%20speech%2F2"
        );
    }

    #[test]
    fn test_descriptor_serializes_nulls_and_camel_case() {
        let record = LocalDebateRecord {
            id: 3,
            name: None,
            description: None,
            pdf_url: "https://res.cloudinary.com/demo/raw/upload/x.pdf".to_string(),
            storage_id: "debates/x".to_string(),
            created_by: "u".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(DocumentDescriptor::from_local(&record)).unwrap();

        assert_eq!(json["id"], "local-3");
        assert_eq!(json["title"], "");
        assert_eq!(
            json["documentUrl"],
            "https://res.cloudinary.com/demo/raw/upload/x.pdf"
        );
        assert!(json["sourceUrl"].is_null());
        assert!(json["description"].is_null());
    }
}
