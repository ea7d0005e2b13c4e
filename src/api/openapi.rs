//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the provider's REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the provider's REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ImmunoSpace provider API",
        version = "0.1.0",
        description = "GA4GH DRS-flavoured API that fetches ImmunoSpace gene expression datasets and serves the derived files",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8083", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit,
        crate::api::routes::search,
        crate::api::routes::get_status,
        crate::api::routes::delete_download,

        // Objects
        crate::api::routes::get_object,
        crate::api::routes::post_object,
        crate::api::routes::get_access_url,
        crate::api::routes::post_access_url,

        // Files
        crate::api::routes::get_file,
        crate::api::routes::get_named_file,

        // System
        crate::api::routes::service_info,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DownloadId,
        crate::types::ObjectId,
        crate::types::FileType,
        crate::types::DataType,
        crate::types::JobStatus,
        crate::types::DeleteStatus,
        crate::types::ContentsObject,
        crate::types::ObjectDescriptor,
        crate::types::SearchEntry,
        crate::types::StatusResult,
        crate::types::DeleteResult,
        crate::types::SubmitParameters,

        // Config types from config.rs
        crate::config::ServiceInfo,
        crate::config::ServiceType,
        crate::config::Organization,

        // API request types from routes
        crate::api::routes::ObjectQuery,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Submit, search, check status and delete downloads"),
        (name = "objects", description = "DRS object descriptors"),
        (name = "files", description = "Stream derived CSV files and zip bundles"),
        (name = "system", description = "Service info, health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_every_route() {
        let spec = ApiDoc::openapi();

        for path in [
            "/submit",
            "/search/{submitter_id}",
            "/status/{download_id}",
            "/delete/{id}",
            "/objects/{object_id}",
            "/objects/{object_id}/access/{access_id}",
            "/files/{id}",
            "/files/{id}/{file_name}",
            "/service-info",
            "/health",
            "/openapi.json",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "OpenAPI spec should document {}",
                path
            );
        }
    }

    #[test]
    fn test_openapi_spec_has_components() {
        let spec = ApiDoc::openapi();
        let components = spec.components.unwrap();

        for schema in ["ObjectDescriptor", "DeleteResult", "ServiceInfo", "ApiError"] {
            assert!(
                components.schemas.contains_key(schema),
                "missing schema {}",
                schema
            );
        }
    }

    #[test]
    fn test_openapi_spec_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.unwrap();
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();

        for tag in ["downloads", "objects", "files", "system"] {
            assert!(tag_names.contains(&tag), "Should have '{}' tag", tag);
        }
    }

    #[test]
    fn test_openapi_spec_info() {
        let spec = ApiDoc::openapi();

        assert_eq!(spec.info.title, "ImmunoSpace provider API");
        assert!(spec.info.description.is_some());
    }
}
