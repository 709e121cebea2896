use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::Result,
    models::{PeriodWindow, RawUsageCounters, Tier, UsageAction, UsageCounterRecord},
};
use crate::services::counter_store::CounterStore;

/// Postgres-backed counter store. Increments go through the
/// `increment_usage_counter` function so find-or-create and the bump happen
/// in one atomic statement.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn fetch_current(
        &self,
        user_id: Uuid,
        daily: &PeriodWindow,
        monthly: &PeriodWindow,
    ) -> Result<RawUsageCounters> {
        // Both windows in one round trip; rows are matched back to their
        // window afterwards.
        let rows = sqlx::query_as::<_, UsageCounterRecord>(
            r#"
            SELECT user_id, tier, period_start, period_end,
                   chat_queries, portfolio_analysis, sec_filings, portfolio_changes,
                   created_at, updated_at
            FROM usage_counters
            WHERE user_id = $1
              AND ((period_start = $2 AND period_end = $3)
                OR (period_start = $4 AND period_end = $5))
            "#,
        )
        .bind(user_id)
        .bind(daily.start)
        .bind(daily.end)
        .bind(monthly.start)
        .bind(monthly.end)
        .fetch_all(&self.pool)
        .await?;

        let mut raw = RawUsageCounters::default();
        for row in rows {
            if row.period_start == daily.start && row.period_end == daily.end {
                raw.daily = Some(row);
            } else if row.period_start == monthly.start && row.period_end == monthly.end {
                raw.monthly = Some(row);
            }
        }

        Ok(raw)
    }

    async fn increment(
        &self,
        user_id: Uuid,
        action: UsageAction,
        tier: Tier,
        window: &PeriodWindow,
    ) -> Result<()> {
        sqlx::query("SELECT increment_usage_counter($1, $2, $3, $4, $5)")
            .bind(user_id)
            .bind(tier.as_str())
            .bind(window.start)
            .bind(window.end)
            .bind(action.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
