use super::*;
use crate::config::ExecutionMode;
use crate::provider::test_helpers::{FakeBehavior, FakeRuntime, GENE_MATRIX, create_test_provider};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Router over a fake-runtime provider; the tempdir must be kept alive
async fn create_test_app(
    mode: ExecutionMode,
) -> (Router, Arc<ImmunespaceProvider>, Arc<FakeRuntime>, tempfile::TempDir) {
    let (provider, runtime, temp_dir) = create_test_provider(mode).await;
    let provider = Arc::new(provider);
    let config = Arc::new(provider.config().clone());
    let app = create_router(provider.clone(), config);
    (app, provider, runtime, temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// POST /submit with the parameters in the query string
async fn submit(app: &Router, submitter: &str, accession: &str) -> Response {
    let uri = format!(
        "/submit?submitter_id={}&accession_id={}&apikey=secret-key",
        submitter.replace('@', "%40"),
        accession
    );
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_api_server_spawns_and_stops() {
    let (_app, provider, _runtime, _temp_dir) = create_test_app(ExecutionMode::Sync).await;

    let mut config = provider.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let api_handle = tokio::spawn(start_api_server(provider, config, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _provider, _runtime, _temp_dir) = create_test_app(ExecutionMode::Sync).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (_app, provider, _runtime, _temp_dir) = create_test_app(ExecutionMode::Sync).await;

    let mut config = provider.config().clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(provider, Arc::new(config));

    let allowed = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("Origin", "http://allowed.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://allowed.example"
    );

    let denied = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("Origin", "http://evil.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let (app, provider, _runtime, _temp_dir) = create_test_app(ExecutionMode::Sync).await;
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = provider.config().clone();
    config.server.api.swagger_ui = false;
    let app = create_router(provider, Arc::new(config));
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
