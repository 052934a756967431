//! Recording admin uploads as local debates.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::storage::{ObjectStorage, UploadTarget};
use crate::store::{LocalDebateRecord, NewDebate};

use super::{DebateError, DebateSource};

/// Storage folder for debate documents.
pub const DEBATES_FOLDER: &str = "debates";

/// An uploaded file plus its form fields.
#[derive(Debug, Clone, Default)]
pub struct DebateUpload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Authenticated uploader.
    pub uploaded_by: String,
}

/// True when the media type is `application/pdf` or the filename ends in
/// `.pdf` (case-insensitive).
#[must_use]
pub fn is_pdf(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let pdf_type = content_type.is_some_and(|value| {
        value
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/pdf"))
    });
    let pdf_name = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));
    pdf_type || pdf_name
}

/// Stores the file, then records it.
#[derive(Clone)]
pub struct DebateUploader {
    storage: Arc<dyn ObjectStorage>,
    source: Arc<dyn DebateSource>,
}

impl DebateUploader {
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>, source: Arc<dyn DebateSource>) -> Self {
        Self { storage, source }
    }

    /// Validates the file type, uploads to storage, then inserts the record.
    ///
    /// Nothing is stored when the type check or the storage upload fails.
    /// When the insert fails after a successful upload the stored object is
    /// left behind and logged.
    ///
    /// # Errors
    ///
    /// - [`DebateError::InvalidUpload`] for non-PDF files (no network call made)
    /// - [`DebateError::Storage`] when the storage upload fails
    /// - [`DebateError::Persistence`] when the insert fails
    #[instrument(skip(self, upload), fields(
        file_name = upload.file_name.as_deref().unwrap_or(""),
        bytes = upload.bytes.len(),
        uploaded_by = %upload.uploaded_by,
    ))]
    pub async fn upload(&self, upload: DebateUpload) -> Result<LocalDebateRecord, DebateError> {
        if !is_pdf(upload.content_type.as_deref(), upload.file_name.as_deref()) {
            return Err(DebateError::InvalidUpload(
                "Only PDF files are allowed".to_string(),
            ));
        }

        let target = UploadTarget::folder(DEBATES_FOLDER).with_file_name(upload.file_name.clone());
        let stored = self.storage.upload(upload.bytes, target).await?;

        let debate = NewDebate {
            name: non_empty(upload.name),
            description: non_empty(upload.description),
            pdf_url: stored.url.clone(),
            storage_id: stored.id.clone(),
            created_by: upload.uploaded_by,
            created_at: Utc::now(),
        };

        match self.source.insert(&debate).await {
            Ok(record) => {
                info!(id = record.id, storage_id = %record.storage_id, "debate uploaded");
                Ok(record)
            }
            Err(insert_error) => {
                error!(
                    storage_id = %stored.id,
                    url = %stored.url,
                    error = %insert_error,
                    "debate insert failed after upload; stored object is orphaned"
                );
                Err(insert_error.into())
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
