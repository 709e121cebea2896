pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/users/:user_id/usage",
            get(handlers::usage::get_usage_stats),
        )
        .route(
            "/api/v1/users/:user_id/usage/:action",
            post(handlers::usage::record_usage),
        )
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .merge(handlers::docs::create_docs_router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
