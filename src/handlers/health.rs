use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{errors::Result, handlers::AppState};

#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Process is up")
    ),
    tag = "health"
)]
pub async fn liveness() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Counter store reachable"),
        (status = 503, description = "Counter store unreachable")
    ),
    tag = "health"
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    // Check counter store connection
    let store_status = match state.usage.ping().await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let ready = store_status == "healthy";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "counter_store": store_status
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
