//! Search, status and deletion handlers.

use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

/// GET /search/:submitter_id - List a submitter's files
#[utoipa::path(
    get,
    path = "/search/{submitter_id}",
    tag = "downloads",
    params(("submitter_id" = String, Path, description = "Submitter email")),
    responses(
        (status = 200, description = "Files submitted by this submitter", body = [crate::types::SearchEntry]),
        (status = 404, description = "No downloads for this submitter", body = crate::error::ApiError)
    )
)]
pub async fn search(State(state): State<AppState>, Path(submitter_id): Path<String>) -> Response {
    match state.provider.search(&submitter_id).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /status/:download_id - Job status of a download
#[utoipa::path(
    get,
    path = "/status/{download_id}",
    tag = "downloads",
    params(("download_id" = String, Path, description = "Download identifier")),
    responses(
        (status = 200, description = "Current status", body = crate::types::StatusResult),
        (status = 404, description = "Unknown download", body = crate::error::ApiError)
    )
)]
pub async fn get_status(State(state): State<AppState>, Path(download_id): Path<String>) -> Response {
    match state.provider.status(&download_id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /delete/:id - Delete a download by object or download id
///
/// Always answers 200; the outcome is in `status`.
#[utoipa::path(
    delete,
    path = "/delete/{id}",
    tag = "downloads",
    params(("id" = String, Path, description = "Object or download identifier")),
    responses(
        (status = 200, description = "Deletion outcome", body = crate::types::DeleteResult)
    )
)]
pub async fn delete_download(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    Json(state.provider.delete(&id).await).into_response()
}
