use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Database;
use crate::debates::{DebateCatalog, DebateUploader, SiteConfig};
use crate::issues::IssuePublisher;
use crate::proxy::{HostAllowlist, SecureProxy};
use crate::remote::{FetchError, FetcherOptions, HttpPageFetcher, PageFetcher};
use crate::storage::{
    CloudinaryStorage, DisabledStorage, ObjectStorage, RawDelivery, StorageError,
};
use crate::store::{DebateStore, IssueStore, TaxonomyStore};

/// Failures wiring the shared state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to build outbound HTTP client: {0}")]
    Fetcher(#[from] FetchError),

    #[error("failed to build storage client: {0}")]
    Storage(#[from] StorageError),
}

/// Shared handles for every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: DebateCatalog,
    pub uploader: DebateUploader,
    pub proxy: SecureProxy,
    pub issues: IssuePublisher,
    pub taxonomy: TaxonomyStore,
    pub authenticator: Arc<dyn Authenticator>,
    /// Public delivery endpoint for stored raw files; `None` without storage.
    pub delivery: Option<RawDelivery>,
}

impl AppState {
    /// Wires the state from explicit collaborators.
    #[must_use]
    pub fn new(
        db: &Database,
        fetcher: Arc<dyn PageFetcher>,
        storage: Arc<dyn ObjectStorage>,
        authenticator: Arc<dyn Authenticator>,
        site: SiteConfig,
        allowlist: HostAllowlist,
    ) -> Self {
        let debates = Arc::new(DebateStore::new(db.clone()));
        Self {
            catalog: DebateCatalog::new(fetcher.clone(), debates.clone(), site),
            uploader: DebateUploader::new(storage.clone(), debates),
            proxy: SecureProxy::new(fetcher, allowlist),
            issues: IssuePublisher::new(IssueStore::new(db.clone()), storage),
            taxonomy: TaxonomyStore::new(db.clone()),
            authenticator,
            delivery: None,
        }
    }

    /// Enables fetching stored PDFs by public id.
    #[must_use]
    pub fn with_delivery(mut self, delivery: RawDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Wires the production state from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when an HTTP client cannot be built.
    pub fn from_config(config: &Config, db: &Database) -> Result<Self, StateError> {
        let fetcher = HttpPageFetcher::new(&FetcherOptions {
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout,
        })?;

        let storage: Arc<dyn ObjectStorage> = match &config.cloudinary {
            Some(cloudinary) => Arc::new(CloudinaryStorage::new(cloudinary.clone())?),
            None => {
                warn!("object storage not configured; uploads will fail");
                Arc::new(DisabledStorage)
            }
        };

        if config.admin_tokens.is_empty() {
            warn!("no admin tokens configured; admin routes will reject every caller");
        }

        if config.public_hosts.is_empty() {
            warn!("FILHAAL_PUBLIC_HOST not set; proxy will not accept this service's own host");
        }
        let allowlist = HostAllowlist::new(&config.trusted_storage_suffix, &config.loopback_host)
            .with_own_hosts(&config.public_hosts);

        let state = Self::new(
            db,
            Arc::new(fetcher),
            storage,
            Arc::new(config.admin_tokens.clone()),
            SiteConfig::new(config.site_url.clone()),
            allowlist,
        );
        Ok(match &config.cloudinary {
            Some(cloudinary) => state.with_delivery(cloudinary.raw_delivery()),
            None => state,
        })
    }
}
