use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use seo_core::{DEFAULT_PAGE_LIMIT, LintReport, NEAR_DUPLICATE_THRESHOLD, PageQuery, find_near_duplicates};
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<u32>,
    offset: Option<u64>,
    search: Option<String>,
}

impl ListParams {
    fn into_query(self) -> PageQuery {
        PageQuery::new(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            self.search,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAltTextRequest {
    #[serde(rename = "altText", default)]
    alt_text: Option<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    state.check_rate()?;
    let Query(params) = params.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let query = params.into_query();
    debug!(?query, "list images");

    let page = state.catalog.read().await.page(&query);
    Ok(Json(json!({
        "ok": true,
        "images": page.images,
        "total": page.total,
        "offset": page.offset,
        "limit": page.limit,
    })))
}

pub async fn update_alt_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAltTextRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let alt_text = payload
        .alt_text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let image = state
        .catalog
        .write()
        .await
        .update_alt_text(&id, alt_text)
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;
    debug!(%id, "alt text updated");
    Ok(Json(json!({ "ok": true, "image": image })))
}

pub async fn lint_page(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    state.check_rate()?;
    let Query(params) = params.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let page = state.catalog.read().await.page(&params.into_query());

    let report = LintReport::build(&page.images);
    let mut duplicates: Vec<&String> = report.duplicates.iter().collect();
    duplicates.sort();
    let near_duplicates = find_near_duplicates(&page.images, NEAR_DUPLICATE_THRESHOLD);

    Ok(Json(json!({
        "ok": true,
        "total": page.total,
        "offset": page.offset,
        "limit": page.limit,
        "counts": report.counts,
        "duplicates": duplicates,
        "nearDuplicates": near_duplicates,
    })))
}
