use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use usage_metering_server::{
    config::Config,
    create_app,
    errors::{AppError, Result},
    handlers::AppState,
    models::{PeriodWindow, RawUsageCounters, Tier, UsageAction},
    services::{CounterStore, InMemoryCounterStore, MetricsService, UsageService},
};
use uuid::Uuid;

struct FailingStore;

#[async_trait]
impl CounterStore for FailingStore {
    async fn fetch_current(
        &self,
        _user_id: Uuid,
        _daily: &PeriodWindow,
        _monthly: &PeriodWindow,
    ) -> Result<RawUsageCounters> {
        Err(AppError::Store("connection refused".to_string()))
    }

    async fn increment(
        &self,
        _user_id: Uuid,
        _action: UsageAction,
        _tier: Tier,
        _window: &PeriodWindow,
    ) -> Result<()> {
        Err(AppError::Store("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Err(AppError::Store("connection refused".to_string()))
    }
}

fn app_with_store(store: Arc<dyn CounterStore>) -> Router {
    let config = Config::from_env().expect("Failed to load config");
    let state = AppState {
        config,
        usage: UsageService::new(store),
        metrics: Arc::new(MetricsService::new().expect("Failed to build metrics registry")),
    };
    create_app(state)
}

fn test_app() -> Router {
    app_with_store(Arc::new(InMemoryCounterStore::new()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body was not valid JSON")
}

#[tokio::test]
async fn stats_for_an_unseen_user_are_all_zero() {
    let app = test_app();
    let user_id = Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{}/usage", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tier"], "free");
    assert_eq!(body["usage"]["daily"]["chat_queries"]["used"], 0);
    assert_eq!(body["usage"]["daily"]["chat_queries"]["limit"], 10);
    assert_eq!(body["usage"]["daily"]["chat_queries"]["remaining"], 10);
    assert_eq!(body["usage"]["daily"]["portfolio_analysis"]["limit"], 5);
    assert_eq!(body["usage"]["monthly"]["sec_filings"]["limit"], 10);
    assert_eq!(body["percentages"]["chat_queries"], 0.0);
    assert_eq!(body["warnings"]["chat_queries"], false);
}

#[tokio::test]
async fn recording_usage_returns_no_content_and_shows_up_in_stats() {
    let app = test_app();
    let user_id = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/users/{}/usage/chat_query?tier=free", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{}/usage?tier=free", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["usage"]["daily"]["chat_queries"]["used"], 1);
    assert_eq!(body["usage"]["daily"]["chat_queries"]["remaining"], 9);
    assert_eq!(body["percentages"]["chat_queries"], 10.0);
}

#[tokio::test]
async fn unknown_action_is_rejected() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/users/{}/usage/coffee_break", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("coffee_break"));
}

#[tokio::test]
async fn malformed_user_id_is_rejected() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/not-a-uuid/usage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_tier_names_fall_back_to_free_limits() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/v1/users/{}/usage?tier=platinum",
                    Uuid::new_v4()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tier"], "free");
    assert_eq!(body["usage"]["daily"]["chat_queries"]["limit"], 10);
}

#[tokio::test]
async fn premium_tier_reports_unlimited() {
    let app = test_app();
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!(
                        "/api/v1/users/{}/usage/sec_filing?tier=premium",
                        user_id
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{}/usage?tier=premium", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tier"], "premium");
    assert_eq!(body["usage"]["monthly"]["sec_filings"]["used"], 3);
    assert_eq!(body["usage"]["monthly"]["sec_filings"]["limit"], "unlimited");
    assert_eq!(
        body["usage"]["monthly"]["sec_filings"]["remaining"],
        "unlimited"
    );
    assert_eq!(body["percentages"]["sec_filings"], 0.0);
    assert_eq!(body["warnings"]["sec_filings"], false);
}

#[tokio::test]
async fn store_failures_surface_as_server_errors() {
    let app = app_with_store(Arc::new(FailingStore));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{}/usage", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Counter store error");
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn liveness_always_succeeds() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readiness_reports_ready_with_a_reachable_store() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["counter_store"], "healthy");
}

#[tokio::test]
async fn readiness_fails_when_the_store_is_down() {
    let app = app_with_store(Arc::new(FailingStore));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["counter_store"], "unhealthy");
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_exposition() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/users/{}/usage/chat_query", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let exposition = String::from_utf8(bytes.to_vec()).expect("Exposition was not UTF-8");
    assert!(exposition.contains("usage_increments_total{action=\"chat_query\"} 1"));
    assert!(exposition.contains("http_requests_total"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]
        .as_object()
        .unwrap()
        .contains_key("/api/v1/users/{user_id}/usage"));
    assert!(body["paths"]
        .as_object()
        .unwrap()
        .contains_key("/api/v1/users/{user_id}/usage/{action}"));
}

#[tokio::test]
async fn swagger_ui_is_mounted() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/docs/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
