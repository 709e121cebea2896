use crate::{config::Config, services::{MetricsService, UsageService}};
use std::sync::Arc;

pub mod docs;
pub mod health;
pub mod metrics;
pub mod usage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub usage: UsageService,
    pub metrics: Arc<MetricsService>,
}
