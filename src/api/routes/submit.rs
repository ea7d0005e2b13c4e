//! Submission handler.

use crate::api::AppState;
use crate::error::Error;
use crate::types::SubmitParameters;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

/// POST /submit - Fetch (or reuse) a dataset and describe the requested file
///
/// Parameters may arrive in the query string, as a urlencoded form, or
/// both; query values win.
#[utoipa::path(
    post,
    path = "/submit",
    tag = "downloads",
    request_body(
        content = crate::types::SubmitParameters,
        content_type = "application/x-www-form-urlencoded",
        description = "submitter_id (or email), accession_id (or group), apikey, data_type, file_type"
    ),
    responses(
        (status = 200, description = "Descriptor of the requested file", body = crate::types::ObjectDescriptor),
        (status = 400, description = "Missing or invalid parameters", body = crate::error::ApiError),
        (status = 404, description = "The download could not be completed", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit(
    State(state): State<AppState>,
    Query(query): Query<SubmitParameters>,
    form: Option<Form<SubmitParameters>>,
) -> Response {
    let parameters = match form {
        Some(Form(form)) => query.merge(form),
        None => query,
    };

    let submission = match parameters.validate() {
        Ok(submission) => submission,
        Err(e) => return e.into_response(),
    };
    let accession_id = submission.accession_id.clone();

    match state.provider.submit(submission).await {
        Ok(descriptor) => Json(descriptor).into_response(),
        Err(e @ (Error::Validation(_) | Error::ShuttingDown)) => e.into_response(),
        Err(e) => {
            // Details stay in the log and in the records' stderr
            tracing::error!(accession_id = %accession_id, error = %e, "Submission failed");
            Error::NotFound(format!("data for {} could not be retrieved", accession_id))
                .into_response()
        }
    }
}
