use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    errors::Result,
    models::{PeriodWindow, RawUsageCounters, Tier, UsageAction, UsageCounterRecord},
};

/// Persistence seam for usage counters. Implementations must guarantee that
/// concurrent increments for the same (user, window) all land on a single
/// row and that none are lost.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read-only snapshot of the rows covering both windows. Absent rows
    /// come back as `None`; this must never create one.
    async fn fetch_current(
        &self,
        user_id: Uuid,
        daily: &PeriodWindow,
        monthly: &PeriodWindow,
    ) -> Result<RawUsageCounters>;

    /// Find-or-create the row for the window and bump one counter by one.
    /// The tier is only written when the row is created.
    async fn increment(
        &self,
        user_id: Uuid,
        action: UsageAction,
        tier: Tier,
        window: &PeriodWindow,
    ) -> Result<()>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<()>;
}

type WindowKey = (Uuid, DateTime<Utc>, DateTime<Utc>);

/// In-memory store for tests and local development. A single write lock
/// around find-or-create-plus-increment gives the same atomicity as the
/// SQL upsert.
#[derive(Default)]
pub struct InMemoryCounterStore {
    rows: RwLock<HashMap<WindowKey, UsageCounterRecord>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn fetch_current(
        &self,
        user_id: Uuid,
        daily: &PeriodWindow,
        monthly: &PeriodWindow,
    ) -> Result<RawUsageCounters> {
        let rows = self.rows.read().await;
        Ok(RawUsageCounters {
            daily: rows.get(&(user_id, daily.start, daily.end)).cloned(),
            monthly: rows.get(&(user_id, monthly.start, monthly.end)).cloned(),
        })
    }

    async fn increment(
        &self,
        user_id: Uuid,
        action: UsageAction,
        tier: Tier,
        window: &PeriodWindow,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        let record = rows
            .entry((user_id, window.start, window.end))
            .or_insert_with(|| UsageCounterRecord::new(user_id, tier, window));
        record.apply(action);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
