use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use usage_metering_server::{
    config::Config,
    create_app,
    database::{counters::PgCounterStore, Database},
    handlers::AppState,
    services::{CounterStore, MetricsService, UsageService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "usage_metering_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let database = Database::new(&config.database_url, config.database_max_connections).await?;
    database.migrate().await?;
    tracing::info!("Database connected, migrations applied");

    let store: Arc<dyn CounterStore> = Arc::new(PgCounterStore::new(&database));
    let usage = UsageService::new(store);
    let metrics = Arc::new(MetricsService::new()?);

    let state = AppState {
        config: config.clone(),
        usage,
        metrics,
    };

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, draining connections");
}
