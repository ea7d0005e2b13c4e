//! DRS object handlers.

use super::ObjectQuery;
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};

/// GET /objects/:object_id - Describe one derived file
#[utoipa::path(
    get,
    path = "/objects/{object_id}",
    tag = "objects",
    params(
        ("object_id" = String, Path, description = "Object identifier"),
        ObjectQuery
    ),
    responses(
        (status = 200, description = "Object descriptor", body = crate::types::ObjectDescriptor),
        (status = 404, description = "Unknown object", body = crate::error::ApiError)
    )
)]
pub async fn get_object(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    Query(query): Query<ObjectQuery>,
) -> Response {
    if query.expand {
        tracing::debug!(object_id = %object_id, "expand requested on a blob object");
    }
    match state.provider.object(&object_id).await {
        Ok(descriptor) => Json(descriptor).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /objects/:object_id - Passport-authorized object lookup (not implemented)
#[utoipa::path(
    post,
    path = "/objects/{object_id}",
    tag = "objects",
    params(("object_id" = String, Path, description = "Object identifier")),
    responses(
        (status = 501, description = "Passport authorization is not supported", body = crate::error::ApiError)
    )
)]
pub async fn post_object(Path(object_id): Path<String>) -> Response {
    passport_not_supported(&object_id)
}

/// GET /objects/:object_id/access/:access_id - Access URL lookup (not implemented)
#[utoipa::path(
    get,
    path = "/objects/{object_id}/access/{access_id}",
    tag = "objects",
    params(
        ("object_id" = String, Path, description = "Object identifier"),
        ("access_id" = String, Path, description = "Access method identifier")
    ),
    responses(
        (status = 501, description = "Access URLs are not supported", body = crate::error::ApiError)
    )
)]
pub async fn get_access_url(Path((object_id, _access_id)): Path<(String, String)>) -> Response {
    passport_not_supported(&object_id)
}

/// POST /objects/:object_id/access/:access_id - Passport-authorized access URL (not implemented)
#[utoipa::path(
    post,
    path = "/objects/{object_id}/access/{access_id}",
    tag = "objects",
    params(
        ("object_id" = String, Path, description = "Object identifier"),
        ("access_id" = String, Path, description = "Access method identifier")
    ),
    responses(
        (status = 501, description = "Access URLs are not supported", body = crate::error::ApiError)
    )
)]
pub async fn post_access_url(Path((object_id, _access_id)): Path<(String, String)>) -> Response {
    passport_not_supported(&object_id)
}

fn passport_not_supported(object_id: &str) -> Response {
    Error::NotSupported(format!(
        "passport and access URL requests are not supported (object {}); use /files",
        object_id
    ))
    .into_response()
}
