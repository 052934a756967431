//! Publishing periodical issues.
//!
//! Each (year, month) has at most one issue. Uploading for a period that
//! already has one replaces its document; the previous storage object is
//! removed after the row points at the new one.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::debates::is_pdf;
use crate::storage::{ObjectStorage, StorageError, UploadTarget};
use crate::store::{IssueStore, IssueUpsert, NewIssue, StoreError};

/// Storage folder for issue documents.
pub const ISSUES_FOLDER: &str = "issues";

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{0}")]
    Invalid(String),

    #[error("Issue not found")]
    NotFound(i64),

    #[error("failed to store issue document: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to read or write issues: {0}")]
    Persistence(#[from] StoreError),
}

/// A validated-on-publish issue upload.
#[derive(Debug, Clone, Default)]
pub struct IssueUpload {
    pub year: i64,
    pub month: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub uploaded_by: String,
}

/// Coordinates issue rows and their stored documents.
#[derive(Clone)]
pub struct IssuePublisher {
    store: IssueStore,
    storage: Arc<dyn ObjectStorage>,
}

impl IssuePublisher {
    #[must_use]
    pub fn new(store: IssueStore, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &IssueStore {
        &self.store
    }

    /// Uploads the document and creates or replaces the period's issue.
    ///
    /// # Errors
    ///
    /// - [`IssueError::Invalid`] for missing title, month outside 1..=12,
    ///   non-positive year, empty or non-PDF file (nothing uploaded)
    /// - [`IssueError::Storage`] when the upload fails (no row written)
    /// - [`IssueError::Persistence`] when the row cannot be written
    #[instrument(skip(self, upload), fields(year = upload.year, month = upload.month))]
    pub async fn publish(&self, upload: IssueUpload) -> Result<IssueUpsert, IssueError> {
        let title = upload.title.trim();
        if title.is_empty() {
            return Err(IssueError::Invalid(
                "Year, month, title, and PDF file are required".to_string(),
            ));
        }
        if upload.year <= 0 {
            return Err(IssueError::Invalid("Year must be positive".to_string()));
        }
        if !(1..=12).contains(&upload.month) {
            return Err(IssueError::Invalid(
                "Month must be between 1 and 12".to_string(),
            ));
        }
        if upload.bytes.is_empty() {
            return Err(IssueError::Invalid("PDF file is required".to_string()));
        }
        if !is_pdf(upload.content_type.as_deref(), upload.file_name.as_deref()) {
            return Err(IssueError::Invalid("Only PDF files are allowed".to_string()));
        }

        let public_id = format!(
            "issue_{}_{}_{}",
            upload.year,
            upload.month,
            Utc::now().timestamp_millis()
        );
        let target = UploadTarget::folder(ISSUES_FOLDER)
            .with_public_id(public_id)
            .with_file_name(upload.file_name.clone());
        let stored = self.storage.upload(upload.bytes, target).await?;

        let issue = NewIssue {
            year: upload.year,
            month: upload.month,
            title: title.to_string(),
            description: upload.description.filter(|d| !d.trim().is_empty()),
            pdf_url: stored.url.clone(),
            pdf_public_id: stored.id.clone(),
            created_by: upload.uploaded_by,
        };
        let result = match self.store.upsert(&issue).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    storage_id = %stored.id,
                    error = %error,
                    "issue row write failed after upload; stored object is orphaned"
                );
                return Err(error.into());
            }
        };

        if let Some(previous) = result.previous_public_id.as_deref() {
            self.delete_object(previous).await;
        }
        info!(id = result.issue.id, outcome = ?result.outcome, "issue published");
        Ok(result)
    }

    /// Deletes the issue's stored document (best effort) and then its row.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::NotFound`] for an unknown id and
    /// [`IssueError::Persistence`] when a query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), IssueError> {
        let issue = self.store.find(id).await?.ok_or(IssueError::NotFound(id))?;
        self.delete_object(&issue.pdf_public_id).await;
        if !self.store.delete(id).await? {
            return Err(IssueError::NotFound(id));
        }
        info!(id, "issue deleted");
        Ok(())
    }

    async fn delete_object(&self, public_id: &str) {
        if public_id.is_empty() {
            return;
        }
        if let Err(error) = self.storage.delete(public_id).await {
            warn!(storage_id = public_id, error = %error, "failed to delete stored issue document");
        }
    }
}
