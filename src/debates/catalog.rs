//! Debate listing and detail resolution.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extract::{ListingEntry, extract_detail, extract_listing};
use crate::remote::{FetchError, PageFetcher};

use super::{
    DebateError, DebateSource, DocumentDescriptor, DocumentId, LOCAL_ID_PREFIX, SiteConfig,
};

/// Merges scraped and locally uploaded debates.
#[derive(Clone)]
pub struct DebateCatalog {
    fetcher: Arc<dyn PageFetcher>,
    source: Arc<dyn DebateSource>,
    site: SiteConfig,
}

impl DebateCatalog {
    /// Creates a catalog over the given fetcher, local source and site.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        source: Arc<dyn DebateSource>,
        site: SiteConfig,
    ) -> Self {
        Self {
            fetcher,
            source,
            site,
        }
    }

    /// Builds the merged listing: local records first (newest first), then
    /// external entries in page order.
    ///
    /// A failed or non-2xx listing fetch fails the whole call. A failed local
    /// read is logged and the external entries are returned alone.
    ///
    /// # Errors
    ///
    /// Returns [`DebateError::Upstream`] or [`DebateError::Fetch`] when the
    /// listing page cannot be loaded.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<DocumentDescriptor>, DebateError> {
        let listing_url = self.site.listing_url();
        let html = self.fetch_html(&listing_url).await?;

        let external: Vec<DocumentDescriptor> =
            extract_listing(&html, &listing_url, self.site.detail_prefix())
                .into_iter()
                .filter(|entry| {
                    let reserved = entry.id.starts_with(LOCAL_ID_PREFIX);
                    if reserved {
                        warn!(id = %entry.id, "dropping scraped id in the local namespace");
                    }
                    !reserved
                })
                .map(external_descriptor)
                .collect();

        let local = match self.source.newest_first().await {
            Ok(records) => records,
            Err(error) => {
                warn!(error = %error, "failed to load local debates; serving external entries only");
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(local.len() + external.len());
        let mut items = Vec::with_capacity(local.len() + external.len());
        for record in &local {
            let mut descriptor = DocumentDescriptor::from_local(record);
            if descriptor.title.is_empty() {
                descriptor.title = format!("Debate {}", record.id);
            }
            if seen.insert(descriptor.id.clone()) {
                items.push(descriptor);
            }
        }
        for descriptor in external {
            if seen.insert(descriptor.id.clone()) {
                items.push(descriptor);
            }
        }

        info!(
            local = local.len(),
            total = items.len(),
            "debate listing assembled"
        );
        Ok(items)
    }

    /// Resolves one document by its serialized id.
    ///
    /// `local-<n>` ids are answered from the local store without any network
    /// fetch. Other ids load the detail page and run extraction; a page with
    /// no recognizable document yields `document_url: None`, not an error.
    ///
    /// # Errors
    ///
    /// - [`DebateError::MissingId`] / [`DebateError::InvalidId`] for bad ids
    /// - [`DebateError::NotFound`] for an unknown local id
    /// - [`DebateError::Upstream`] / [`DebateError::Fetch`] when the detail
    ///   page cannot be loaded
    /// - [`DebateError::Persistence`] when the local lookup fails
    #[instrument(skip(self))]
    pub async fn resolve(&self, raw_id: &str) -> Result<DocumentDescriptor, DebateError> {
        match DocumentId::parse(raw_id)? {
            DocumentId::Local(id) => {
                let record = self
                    .source
                    .find(id)
                    .await?
                    .ok_or_else(|| DebateError::NotFound(raw_id.to_string()))?;
                Ok(DocumentDescriptor::from_local(&record))
            }
            DocumentId::External(id) => {
                let page_url = self.site.detail_url(&id);
                let parsed =
                    Url::parse(&page_url).map_err(|_| FetchError::invalid_url(&page_url))?;
                let html = self.fetch_html(&parsed).await?;
                let extraction = extract_detail(&html, &parsed);
                if extraction.document_url.is_none() {
                    debug!(id = %id, "no document reference on detail page");
                }

                Ok(DocumentDescriptor {
                    id,
                    title: extraction.title,
                    document_url: extraction.document_url,
                    source_url: Some(page_url),
                    description: None,
                })
            }
        }
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, DebateError> {
        let page = self.fetcher.fetch(url.as_str()).await?;
        if !page.is_success() {
            warn!(url = %url, status = page.status, "debates site returned an error status");
            return Err(DebateError::Upstream {
                url: url.to_string(),
                status: page.status,
            });
        }
        Ok(page.text().into_owned())
    }
}

fn external_descriptor(entry: ListingEntry) -> DocumentDescriptor {
    DocumentDescriptor {
        id: entry.id,
        title: entry.title,
        document_url: None,
        source_url: Some(entry.source_url),
        description: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::remote::FetchedPage;
    use crate::store::{self, LocalDebateRecord, NewDebate, StoreError};

    struct ScriptedFetcher {
        status: u16,
        body: String,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            Ok(FetchedPage {
                url: url.to_string(),
                status: self.status,
                content_type: Some("text/html".to_string()),
                body: self.body.clone().into_bytes(),
            })
        }
    }

    struct MemorySource {
        records: Vec<LocalDebateRecord>,
        fail_reads: bool,
    }

    #[async_trait]
    impl DebateSource for MemorySource {
        async fn newest_first(&self) -> store::Result<Vec<LocalDebateRecord>> {
            if self.fail_reads {
                return Err(StoreError::from(sqlx::Error::PoolClosed));
            }
            let mut records = self.records.clone();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(records)
        }

        async fn find(&self, id: i64) -> store::Result<Option<LocalDebateRecord>> {
            if self.fail_reads {
                return Err(StoreError::from(sqlx::Error::PoolClosed));
            }
            Ok(self.records.iter().find(|r| r.id == id).cloned())
        }

        async fn insert(&self, _debate: &NewDebate) -> store::Result<LocalDebateRecord> {
            Err(StoreError::from(sqlx::Error::PoolClosed))
        }
    }

    fn record(id: i64, name: Option<&str>, created_at: DateTime<Utc>) -> LocalDebateRecord {
        LocalDebateRecord {
            id,
            name: name.map(str::to_string),
            description: Some(format!("about {id}")),
            pdf_url: format!("https://res.cloudinary.com/demo/raw/upload/debates/{id}.pdf"),
            storage_id: format!("debates/{id}"),
            created_by: "admin".to_string(),
            created_at,
        }
    }

    fn source(records: Vec<LocalDebateRecord>) -> Arc<MemorySource> {
        Arc::new(MemorySource {
            records,
            fail_reads: false,
        })
    }

    const LISTING: &str = r#"
        <a href="/debates/censorship">Censorship</a>
        <a href="/debates/climate">Climate</a>
        <a href="/debates/censorship">Again</a>
        <a href="/debates/local-99">Spoofed</a>
    "#;

    #[tokio::test]
    async fn test_list_puts_local_entries_first_newest_first() {
        let fetcher = ScriptedFetcher::new(200, LISTING);
        let records = vec![
            record(1, Some("Oldest"), Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            record(2, None, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ];
        let catalog = DebateCatalog::new(fetcher, source(records), SiteConfig::default());

        let items = catalog.list().await.unwrap();
        let ids: Vec<_> = items.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, ["local-2", "local-1", "censorship", "climate"]);
        assert_eq!(items[0].title, "Debate 2");
        assert_eq!(items[1].title, "Oldest");
        assert!(items[0].source_url.is_none());
        assert_eq!(
            items[2].source_url.as_deref(),
            Some("https://filhaal.vercel.app/debates/censorship")
        );
        assert!(items[2].document_url.is_none());
    }

    #[tokio::test]
    async fn test_list_remote_failure_fails_whole_listing() {
        let fetcher = ScriptedFetcher::new(503, "down");
        let records = vec![record(1, Some("Local"), Utc::now())];
        let catalog = DebateCatalog::new(fetcher, source(records), SiteConfig::default());

        let error = catalog.list().await.unwrap_err();

        assert!(matches!(error, DebateError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_list_local_failure_degrades_to_external_only() {
        let fetcher = ScriptedFetcher::new(200, LISTING);
        let failing = Arc::new(MemorySource {
            records: Vec::new(),
            fail_reads: true,
        });
        let catalog = DebateCatalog::new(fetcher, failing, SiteConfig::default());

        let items = catalog.list().await.unwrap();
        let ids: Vec<_> = items.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, ["censorship", "climate"]);
    }

    #[tokio::test]
    async fn test_resolve_local_never_fetches() {
        let fetcher = ScriptedFetcher::new(200, "<iframe src='x'></iframe>");
        let records = vec![record(7, Some("Seven"), Utc::now())];
        let catalog =
            DebateCatalog::new(fetcher.clone(), source(records), SiteConfig::default());

        let descriptor = catalog.resolve("local-7").await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(descriptor.id, "local-7");
        assert_eq!(descriptor.title, "Seven");
        assert!(descriptor.source_url.is_none());
        assert_eq!(
            descriptor.document_url.as_deref(),
            Some("https://res.cloudinary.com/demo/raw/upload/debates/7.pdf")
        );
        assert_eq!(descriptor.description.as_deref(), Some("about 7"));
    }

    #[tokio::test]
    async fn test_resolve_invalid_local_id_touches_nothing() {
        let fetcher = ScriptedFetcher::new(200, "");
        let failing = Arc::new(MemorySource {
            records: Vec::new(),
            fail_reads: true,
        });
        let catalog = DebateCatalog::new(fetcher.clone(), failing, SiteConfig::default());

        let error = catalog.resolve("local-abc").await.unwrap_err();

        assert!(matches!(error, DebateError::InvalidId(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_unknown_local_id_is_not_found() {
        let fetcher = ScriptedFetcher::new(200, "");
        let catalog = DebateCatalog::new(fetcher, source(Vec::new()), SiteConfig::default());

        let error = catalog.resolve("local-5").await.unwrap_err();

        assert!(matches!(error, DebateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_external_extracts_document_and_title() {
        let html = r#"<title>T</title><h1>Censorship</h1><a href="/files/c.pdf">pdf</a>"#;
        let fetcher = ScriptedFetcher::new(200, html);
        let catalog =
            DebateCatalog::new(fetcher.clone(), source(Vec::new()), SiteConfig::default());

        let descriptor = catalog.resolve("free speech").await.unwrap();

        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            ["https://filhaal.vercel.app/debates/free%20speech"]
        );
        assert_eq!(descriptor.id, "free speech");
        assert_eq!(descriptor.title, "Censorship");
        assert_eq!(
            descriptor.document_url.as_deref(),
            Some("https://filhaal.vercel.app/files/c.pdf")
        );
        assert_eq!(
            descriptor.source_url.as_deref(),
            Some("https://filhaal.vercel.app/debates/free%20speech")
        );
    }

    #[tokio::test]
    async fn test_resolve_page_without_document_is_soft_none() {
        let fetcher = ScriptedFetcher::new(200, "<h2>Empty</h2><p>nothing</p>");
        let catalog = DebateCatalog::new(fetcher, source(Vec::new()), SiteConfig::default());

        let descriptor = catalog.resolve("empty").await.unwrap();

        assert!(descriptor.document_url.is_none());
        assert_eq!(descriptor.title, "Empty");
    }

    #[tokio::test]
    async fn test_resolve_upstream_error_is_hard_failure() {
        let fetcher = ScriptedFetcher::new(404, "missing");
        let catalog = DebateCatalog::new(fetcher, source(Vec::new()), SiteConfig::default());

        let error = catalog.resolve("gone").await.unwrap_err();

        assert!(matches!(error, DebateError::Upstream { status: 404, .. }));
    }
}
