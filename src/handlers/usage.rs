use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    models::{Tier, UsageAction, UsageStats},
};

#[derive(Debug, Deserialize)]
pub struct TierQuery {
    pub tier: Option<String>,
}

impl TierQuery {
    /// Unknown or missing tier names fall back to the free tier rather
    /// than rejecting the request.
    fn resolve(&self) -> Tier {
        self.tier.as_deref().map(Tier::from_name).unwrap_or(Tier::Free)
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/usage",
    params(
        ("user_id" = Uuid, Path, description = "User to report usage for"),
        ("tier" = Option<String>, Query, description = "Tier whose limits apply; defaults to free")
    ),
    responses(
        (status = 200, description = "Usage statistics for the current daily and monthly periods", body = UsageStats),
        (status = 500, description = "Counter store unavailable")
    ),
    tag = "usage"
)]
pub async fn get_usage_stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TierQuery>,
) -> Result<Json<UsageStats>> {
    let stats = state
        .usage
        .get_user_usage_stats(user_id, query.resolve())
        .await?;

    state.metrics.record_stats_read();

    Ok(Json(stats))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/usage/{action}",
    params(
        ("user_id" = Uuid, Path, description = "User the event belongs to"),
        ("action" = String, Path, description = "One of chat_query, portfolio_analysis, sec_filing, portfolio_change"),
        ("tier" = Option<String>, Query, description = "Tier recorded on the period row if this event creates it")
    ),
    responses(
        (status = 204, description = "Event recorded"),
        (status = 400, description = "Unknown action name"),
        (status = 500, description = "Counter store unavailable")
    ),
    tag = "usage"
)]
pub async fn record_usage(
    State(state): State<AppState>,
    Path((user_id, action)): Path<(Uuid, String)>,
    Query(query): Query<TierQuery>,
) -> Result<StatusCode> {
    let action = UsageAction::from_name(&action)
        .ok_or_else(|| AppError::Validation(format!("Unknown usage action: {}", action)))?;

    state
        .usage
        .increment_usage(user_id, action, query.resolve())
        .await?;

    state.metrics.record_increment(action);

    Ok(StatusCode::NO_CONTENT)
}
