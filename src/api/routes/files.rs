//! File and bundle streaming handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::provider::OpenedFile;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio_util::io::ReaderStream;

/// GET /files/:id - Stream an object's CSV or a download's zip bundle
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "Object identifier (single CSV) or download identifier (zip bundle)")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown identifier or missing file", body = crate::error::ApiError)
    )
)]
pub async fn get_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.provider.open(&id, None).await {
        Ok(opened) => stream_file(opened),
        Err(e) => file_error(&id, e),
    }
}

/// GET /files/:id/:file_name - Stream one named CSV of a download
#[utoipa::path(
    get,
    path = "/files/{id}/{file_name}",
    tag = "files",
    params(
        ("id" = String, Path, description = "Download or object identifier"),
        ("file_name" = String, Path, description = "File name, with or without the .csv extension")
    ),
    responses(
        (status = 200, description = "CSV contents", content_type = "text/csv"),
        (status = 404, description = "No such file", body = crate::error::ApiError)
    )
)]
pub async fn get_named_file(
    State(state): State<AppState>,
    Path((id, file_name)): Path<(String, String)>,
) -> Response {
    match state.provider.open(&id, Some(&file_name)).await {
        Ok(opened) => stream_file(opened),
        Err(e) => file_error(&id, e),
    }
}

/// Stream an opened file in chunks; a read error aborts the body
/// Log the full error (with any server-side path) and answer with its client form
fn file_error(id: &str, error: Error) -> Response {
    tracing::warn!(id = %id, error = %error, "File request failed");
    error.into_response()
}

fn stream_file(opened: OpenedFile) -> Response {
    let file_name = opened.file_name.clone();
    let stream = ReaderStream::new(opened.file).inspect_err(move |e| {
        tracing::error!(file = %file_name, error = %e, "File stream aborted");
    });

    Response::builder()
        .header(header::CONTENT_TYPE, opened.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", opened.file_name),
        )
        .header(header::CONTENT_LENGTH, opened.len)
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            Error::Other(format!("failed to build file response: {}", e)).into_response()
        })
}
