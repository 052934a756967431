//! `/api/issues/*`.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::issues::{IssueError, IssueUpload};
use crate::proxy::{PdfDocument, ProxyError};
use crate::storage::StorageError;
use crate::store::{Issue, IssueFilter, UpsertOutcome};

use super::auth::SuperAdminCaller;
use super::error::ApiError;
use super::form::UploadForm;
use super::state::AppState;

const STORED_PDF_FILENAME: &str = "document.pdf";

#[derive(Debug, Serialize)]
pub struct Years {
    years: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct IssueList {
    issues: Vec<Issue>,
}

#[derive(Debug, Serialize)]
pub struct IssueBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    issue: Issue,
}

#[derive(Debug, Serialize)]
pub struct Message {
    message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    year: Option<String>,
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetaUpdate {
    title: Option<String>,
    description: Option<String>,
}

pub async fn years(State(state): State<AppState>) -> Result<Json<Years>, ApiError> {
    let years = state.issues.store().years().await?;
    Ok(Json(Years { years }))
}

pub async fn content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<IssueList>, ApiError> {
    let filter = IssueFilter {
        year: optional_number(query.year.as_deref(), "year")?,
        month: optional_number(query.month.as_deref(), "month")?,
    };
    let issues = state.issues.store().list(filter).await?;
    Ok(Json(IssueList { issues }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IssueBody>, ApiError> {
    let id = issue_id(&id)?;
    let issue = state
        .issues
        .store()
        .find(id)
        .await?
        .ok_or(IssueError::NotFound(id))?;
    Ok(Json(IssueBody {
        message: None,
        issue,
    }))
}

pub async fn pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<PdfDocument, ApiError> {
    let id = issue_id(&id)?;
    let issue = state
        .issues
        .store()
        .find(id)
        .await?
        .ok_or(IssueError::NotFound(id))?;
    Ok(state.proxy.fetch_trusted(&issue.pdf_url, None).await?)
}

/// Streams a stored PDF by its storage public id. The id arrives
/// percent-decoded and may contain `/`.
pub async fn pdf_by_public_id(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<PdfDocument, ApiError> {
    let delivery = state
        .delivery
        .as_ref()
        .ok_or(IssueError::Storage(StorageError::NotConfigured))?;
    let url = delivery
        .url(&public_id)
        .ok_or_else(|| ApiError::bad_request("Public id is required"))?;

    match state.proxy.fetch_trusted(&url, Some(STORED_PDF_FILENAME)).await {
        Ok(document) => Ok(document),
        Err(ProxyError::Upstream { .. }) => Err(ApiError::not_found("PDF not found")),
        Err(err) => Err(err.into()),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    SuperAdminCaller(caller): SuperAdminCaller,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IssueBody>), ApiError> {
    let mut form = UploadForm::read(multipart, &["pdf"]).await?;
    let missing = || ApiError::bad_request("Year, month, title, and PDF file are required");

    let year = required_number(form.text("year").as_deref(), "year").map_err(|_| missing())?;
    let month = required_number(form.text("month").as_deref(), "month").map_err(|_| missing())?;
    let title = form.text("title").ok_or_else(missing)?;
    let file = form.file.take().ok_or_else(missing)?;

    let result = state
        .issues
        .publish(IssueUpload {
            year,
            month,
            title,
            description: form.text("description"),
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
            uploaded_by: caller.user_id,
        })
        .await?;

    let (status, message) = match result.outcome {
        UpsertOutcome::Inserted => (StatusCode::CREATED, "Issue uploaded successfully"),
        UpsertOutcome::Replaced => (StatusCode::OK, "Issue updated successfully"),
    };
    Ok((
        status,
        Json(IssueBody {
            message: Some(message),
            issue: result.issue,
        }),
    ))
}

pub async fn update_meta(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _super_admin: SuperAdminCaller,
    Json(update): Json<MetaUpdate>,
) -> Result<Json<IssueBody>, ApiError> {
    let id = issue_id(&id)?;
    let title = update
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;
    let description = update
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let issue = state
        .issues
        .store()
        .update_meta(id, title, description)
        .await?
        .ok_or(IssueError::NotFound(id))?;
    Ok(Json(IssueBody {
        message: Some("Issue updated successfully"),
        issue,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _super_admin: SuperAdminCaller,
) -> Result<Json<Message>, ApiError> {
    let id = issue_id(&id)?;
    state.issues.delete(id).await?;
    Ok(Json(Message {
        message: "Issue deleted successfully",
    }))
}

fn issue_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid issue id: {raw}")))
}

fn required_number(raw: Option<&str>, name: &str) -> Result<i64, ApiError> {
    optional_number(raw, name)?.ok_or_else(|| ApiError::bad_request(format!("Missing {name}")))
}

fn optional_number(raw: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {name}: {value}"))),
    }
}
