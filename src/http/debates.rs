//! `/api/debates`, `/api/debate`, `/api/debates/proxy`, `/api/debates/upload`.

use axum::Json;
use axum::extract::{Multipart, Query, State};
use serde::{Deserialize, Serialize};

use crate::debates::{DebateError, DebateUpload, DocumentDescriptor};
use crate::proxy::PdfDocument;
use crate::store::LocalDebateRecord;

use super::auth::AdminCaller;
use super::error::ApiError;
use super::form::UploadForm;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct DebateList {
    items: Vec<DocumentDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct DebateCreated {
    debate: LocalDebateRecord,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
    filename: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<DebateList>, ApiError> {
    let items = state.catalog.list().await?;
    Ok(Json(DebateList { items }))
}

pub async fn detail(
    State(state): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<DocumentDescriptor>, ApiError> {
    let id = query.id.ok_or(DebateError::MissingId)?;
    Ok(Json(state.catalog.resolve(&id).await?))
}

pub async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<PdfDocument, ApiError> {
    let document = state
        .proxy
        .fetch_pdf(query.url.as_deref(), query.filename.as_deref())
        .await?;
    Ok(document)
}

pub async fn upload(
    State(state): State<AppState>,
    AdminCaller(caller): AdminCaller,
    multipart: Multipart,
) -> Result<Json<DebateCreated>, ApiError> {
    let mut form = UploadForm::read(multipart, &["pdf", "file"]).await?;
    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("PDF file is required"))?;

    let debate = state
        .uploader
        .upload(DebateUpload {
            name: form.text("name"),
            description: form.text("description"),
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
            uploaded_by: caller.user_id,
        })
        .await?;
    Ok(Json(DebateCreated { debate }))
}
