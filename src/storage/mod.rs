//! Binary object storage.
//!
//! Uploaded PDFs live on a remote asset host. The rest of the crate only sees
//! the [`ObjectStorage`] contract: upload bytes into a folder and get back a
//! stable URL plus an identifier that can later be passed to `delete`.
//!
//! - [`CloudinaryStorage`] - Cloudinary REST implementation (raw resources)
//! - [`DisabledStorage`] - stand-in used when no credentials are configured

mod cloudinary;

pub use cloudinary::{
    CloudinaryConfig, CloudinaryStorage, DEFAULT_API_BASE, DEFAULT_DELIVERY_BASE, RawDelivery,
};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage credentials are configured.
    #[error("object storage is not configured")]
    NotConfigured,

    /// The storage API could not be reached.
    #[error("network error talking to object storage: {0}")]
    Network(#[source] reqwest::Error),

    /// The storage API answered with a failure status.
    #[error("object storage rejected {operation} with HTTP {status}: {message}")]
    Rejected {
        /// `upload` or `delete`.
        operation: &'static str,
        /// HTTP status from the storage API.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The storage API answered 2xx with an unexpected body.
    #[error("object storage returned an unreadable response: {0}")]
    MalformedResponse(String),
}

/// Where an upload should land.
#[derive(Debug, Clone, Default)]
pub struct UploadTarget {
    /// Folder (key prefix) on the asset host, e.g. `debates`.
    pub folder: String,
    /// Explicit object name within the folder; the host picks one when `None`.
    pub public_id: Option<String>,
    /// Original filename, forwarded for the host's bookkeeping.
    pub file_name: Option<String>,
}

impl UploadTarget {
    /// Target in `folder` with a host-assigned name.
    #[must_use]
    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit object name.
    #[must_use]
    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    /// Sets the original filename.
    #[must_use]
    pub fn with_file_name(mut self, file_name: Option<String>) -> Self {
        self.file_name = file_name;
        self
    }
}

/// A stored object: stable retrieval URL and the identifier used for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Stable absolute URL of the object.
    pub url: String,
    /// Storage-side identifier.
    pub id: String,
}

/// Binary object storage contract.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads `bytes` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the object was not stored.
    async fn upload(&self, bytes: Vec<u8>, target: UploadTarget)
    -> Result<StoredObject, StorageError>;

    /// Deletes a previously stored object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the deletion request failed.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

/// Storage used when credentials are missing; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStorage;

#[async_trait]
impl ObjectStorage for DisabledStorage {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        _target: UploadTarget,
    ) -> Result<StoredObject, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn delete(&self, _id: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured)
    }
}
