use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::usage::get_usage_stats,
        crate::handlers::usage::record_usage,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
    ),
    components(
        schemas(
            crate::models::Tier,
            crate::models::Limit,
            crate::models::PeriodWindow,
            crate::models::UsageMetric,
            crate::models::DailyUsage,
            crate::models::MonthlyUsage,
            crate::models::UsageBreakdown,
            crate::models::StatsPeriods,
            crate::models::QuotaPercentages,
            crate::models::QuotaWarnings,
            crate::models::UsageStats,
        )
    ),
    tags(
        (name = "usage", description = "Per-user usage counters and quota statistics"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Usage Metering API",
        version = "1.0.0",
        description = "Tracks billable actions per user and reports quota consumption against tier limits",
        contact(
            name = "API Support",
            email = "support@example.com"
        )
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
