//! Pipeline stage ordering and outcomes, exercised in-process.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use pos_gateway::http::build_router;
use pos_gateway::http::X_CORRELATION_ID;

mod common;

use common::{app_state, standard_validator, test_config, MockBackend};

async fn gateway(backend: &MockBackend) -> Router {
    gateway_with(backend, |_| {}).await
}

async fn gateway_with(backend: &MockBackend, tweak: impl FnOnce(&mut pos_gateway::GatewayConfig)) -> Router {
    let mut config = test_config(&backend.url());
    tweak(&mut config);
    build_router(app_state(config, Arc::new(standard_validator())))
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_bypasses_pipeline() {
    let backend = common::start_mock_backend("{}").await;
    let response = gateway(&backend).await.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "status": "healthy" }));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized_before_dispatch() {
    let backend = common::start_mock_backend("{}").await;
    let response = gateway(&backend)
        .await
        .oneshot(get("/api/v1/orders/42", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(X_CORRELATION_ID).is_some());
    assert_eq!(json_body(response).await, serde_json::json!({ "error": "Unauthorized" }));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let backend = common::start_mock_backend("{}").await;
    let response = gateway(&backend)
        .await
        .oneshot(get("/api/v1/orders/42", Some("forged")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_disjoint_roles_are_forbidden() {
    let backend = common::start_mock_backend("{}").await;
    let app = gateway(&backend).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/inventory/stock", Some("customer-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "Forbidden");

    let response = app
        .oneshot(get("/api/v1/notifications/1", Some("staff-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_authorized_request_is_forwarded() {
    let backend = common::start_programmable_backend(|_req| async { (200, "{\"id\":42}".to_string()) }).await;
    let request = Request::builder()
        .uri("/api/v1/orders/42?expand=items")
        .header(header::AUTHORIZATION, "Bearer staff-token")
        .header(X_CORRELATION_ID, "corr-123")
        .body(Body::empty())
        .unwrap();

    let response = gateway(&backend).await.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(X_CORRELATION_ID).unwrap(), "corr-123");
    assert_eq!(json_body(response).await, serde_json::json!({ "id": 42 }));

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/42?expand=items");
    assert_eq!(seen[0].header("authorization"), Some("Bearer staff-token"));
    assert_eq!(seen[0].header("x-correlation-id"), Some("corr-123"));
    assert!(seen[0].header("x-forwarded-for").is_some());
}

#[tokio::test]
async fn test_post_body_is_forwarded() {
    let backend = common::start_programmable_backend(|req| async move { (201, req.body) }).await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/orders")
        .header(header::AUTHORIZATION, "Bearer customer-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"items\":[1,2]}"))
        .unwrap();

    let response = gateway(&backend).await.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await, serde_json::json!({ "items": [1, 2] }));
    assert_eq!(backend.requests()[0].path, "/");
}

#[tokio::test]
async fn test_open_route_needs_no_token() {
    let backend = common::start_mock_backend("{\"token\":\"t\"}").await;
    let response = gateway(&backend)
        .await
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.requests()[0].path, "/login");
}

#[tokio::test]
async fn test_unregistered_service_is_not_found() {
    let backend = common::start_mock_backend("{}").await;
    let response = gateway(&backend)
        .await
        .oneshot(get("/api/v1/reports/1", Some("admin-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(X_CORRELATION_ID).is_some());
    assert_eq!(json_body(response).await["error"], "Not Found");
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_rate_limit_rejects_with_retry_after() {
    let backend = common::start_mock_backend("{}").await;
    let app = gateway_with(&backend, |config| {
        config.rate_limit.capacity = 2;
        config.rate_limit.window_secs = 60;
    })
    .await;

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/api/v1/menu/items", Some("customer-token"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get("/api/v1/menu/items", Some("customer-token"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    assert!(response.headers().get(X_CORRELATION_ID).is_some());
    assert_eq!(json_body(response).await["error"], "Too many requests");

    // Admission keys are per user; another caller still has capacity
    let response = app.oneshot(get("/api/v1/menu/items", Some("staff-token"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.hits(), 3);
}

#[tokio::test]
async fn test_downstream_client_errors_pass_through() {
    let backend = common::start_programmable_backend(|_req| async {
        (422, "{\"reason\":\"out of stock\"}".to_string())
    })
    .await;

    let response = gateway(&backend)
        .await
        .oneshot(get("/api/v1/orders/7", Some("customer-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await, serde_json::json!({ "reason": "out of stock" }));
    // Not retried
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_generated_correlation_ids_are_unique() {
    let backend = common::start_mock_backend("{}").await;
    let app = gateway(&backend).await;

    let a = app.clone().oneshot(get("/api/v1/orders/1", None)).await.unwrap();
    let b = app.oneshot(get("/api/v1/orders/1", None)).await.unwrap();

    assert_ne!(
        a.headers().get(X_CORRELATION_ID).unwrap(),
        b.headers().get(X_CORRELATION_ID).unwrap()
    );
}
