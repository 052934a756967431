//! `/api/categories`, `/api/tags`, `/api/image-categories`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::store::{NewTerm, TaxonomyKind, Term, slugify};

use super::auth::AdminCaller;
use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TermBody {
    name: Option<String>,
    description: Option<String>,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Term>>, ApiError> {
    list(&state, TaxonomyKind::Category).await
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Term>>, ApiError> {
    list(&state, TaxonomyKind::Tag).await
}

pub async fn list_image_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Term>>, ApiError> {
    list(&state, TaxonomyKind::ImageCategory).await
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Json(body): Json<TermBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&state, TaxonomyKind::Category, body).await
}

pub async fn create_tag(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Json(body): Json<TermBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&state, TaxonomyKind::Tag, body).await
}

pub async fn create_image_category(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Json(body): Json<TermBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&state, TaxonomyKind::ImageCategory, body).await
}

async fn list(state: &AppState, kind: TaxonomyKind) -> Result<Json<Vec<Term>>, ApiError> {
    Ok(Json(state.taxonomy.list(kind).await?))
}

async fn create(
    state: &AppState,
    kind: TaxonomyKind,
    body: TermBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !slugify(n).is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} name is required", capitalized(kind))))?;

    let term = state
        .taxonomy
        .create(
            kind,
            &NewTerm {
                name,
                description: body.description.filter(|d| !d.trim().is_empty()),
            },
        )
        .await?;

    let mut response = Map::new();
    response.insert(
        "message".to_string(),
        json!(format!("{} created successfully", capitalized(kind))),
    );
    response.insert(kind.response_key().to_string(), json!(term));
    Ok((StatusCode::CREATED, Json(Value::Object(response))))
}

fn capitalized(kind: TaxonomyKind) -> String {
    let label = kind.label();
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_uppercase().to_string() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalized_labels() {
        assert_eq!(capitalized(TaxonomyKind::Category), "Category");
        assert_eq!(capitalized(TaxonomyKind::ImageCategory), "Image category");
    }
}
