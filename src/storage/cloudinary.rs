//! Cloudinary implementation of [`ObjectStorage`].
//!
//! Uses the REST upload API for `raw` resources with SHA-256 signed,
//! multipart-encoded requests.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::{ObjectStorage, StorageError, StoredObject, UploadTarget};

/// Public Cloudinary API base.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
/// Public Cloudinary delivery host.
pub const DEFAULT_DELIVERY_BASE: &str = "https://res.cloudinary.com";

/// Credentials and endpoint for a Cloudinary account.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Account cloud name.
    pub cloud_name: String,
    /// API key.
    pub api_key: String,
    /// API secret, used only for signing.
    pub api_secret: String,
    /// API base URL (overridable for tests).
    pub api_base: String,
    /// Delivery base URL for stored objects.
    pub delivery_base: String,
}

impl CloudinaryConfig {
    /// Delivery addressing for this account's raw objects.
    #[must_use]
    pub fn raw_delivery(&self) -> RawDelivery {
        RawDelivery::new(&self.delivery_base, &self.cloud_name)
    }
}

/// Builds delivery URLs for `raw` objects from their public ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDelivery {
    base: String,
    cloud_name: String,
}

impl RawDelivery {
    #[must_use]
    pub fn new(base: &str, cloud_name: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
        }
    }

    /// `<base>/<cloud>/raw/upload/<public_id>`, or `None` for a blank id.
    #[must_use]
    pub fn url(&self, public_id: &str) -> Option<String> {
        let public_id = public_id.trim().trim_start_matches('/');
        if public_id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/raw/upload/{public_id}",
            self.base, self.cloud_name
        ))
    }
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_base", &self.api_base)
            .field("delivery_base", &self.delivery_base)
            .finish_non_exhaustive()
    }
}

/// Cloudinary-backed object storage.
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryStorage {
    /// Creates storage for the given account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Network`] when the HTTP client cannot be built.
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .user_agent(crate::user_agent::default_user_agent())
            .build()
            .map_err(StorageError::Network)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/raw/{action}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Adds `api_key`, `signature` and `signature_algorithm` to a form whose
    /// signed fields are `params`.
    fn signed_form(&self, params: &[(&'static str, String)]) -> Form {
        let signature = sign(params, &self.config.api_secret);
        params
            .iter()
            .fold(Form::new(), |form, (key, value)| form.text(*key, value.clone()))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn send(
        &self,
        operation: &'static str,
        action: &str,
        form: Form,
    ) -> Result<reqwest::Response, StorageError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await
            .map_err(StorageError::Network)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);
        Err(StorageError::Rejected {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), folder = %target.folder))]
    async fn upload(
        &self,
        bytes: Vec<u8>,
        target: UploadTarget,
    ) -> Result<StoredObject, StorageError> {
        let mut params = vec![
            ("folder", target.folder.clone()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        if let Some(public_id) = &target.public_id {
            params.push(("public_id", public_id.clone()));
        }

        let file_name = target
            .file_name
            .clone()
            .unwrap_or_else(|| "document.pdf".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(StorageError::Network)?;
        let form = self.signed_form(&params).part("file", part);

        let response = self.send("upload", "upload", form).await?;
        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|error| StorageError::MalformedResponse(error.to_string()))?;

        info!(id = %uploaded.public_id, url = %uploaded.secure_url, "object uploaded");
        Ok(StoredObject {
            url: uploaded.secure_url,
            id: uploaded.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let params = [
            ("public_id", id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];

        let response = self
            .send("delete", "destroy", self.signed_form(&params))
            .await?;
        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|error| StorageError::MalformedResponse(error.to_string()))?;

        debug!(result = %destroyed.result, "object delete acknowledged");
        Ok(())
    }
}

/// Signs request parameters: `k=v` pairs sorted by key, joined with `&`,
/// suffixed with the secret, SHA-256, lowercase hex.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let payload = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{payload}{secret}").as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}
