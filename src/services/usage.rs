use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::Result,
    models::{
        DailyUsage, Limit, MonthlyUsage, PeriodWindow, QuotaPercentages, QuotaWarnings,
        RawUsageCounters, StatsPeriods, Tier, TierLimits, UsageAction, UsageBreakdown,
        UsageMetric, UsageStats,
    },
    services::counter_store::CounterStore,
};

/// Warnings flip on once a quota reaches this share of its ceiling.
const WARNING_THRESHOLD_PCT: f64 = 80.0;

/// Read side and write side of usage tracking, stateless between requests.
/// Every call computes the period windows fresh from the clock.
#[derive(Clone)]
pub struct UsageService {
    store: Arc<dyn CounterStore>,
}

impl UsageService {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Current usage statistics for one user. Missing counter rows read as
    /// zero usage; a store failure propagates rather than being papered
    /// over with zeros.
    pub async fn get_user_usage_stats(&self, user_id: Uuid, tier: Tier) -> Result<UsageStats> {
        let now = Utc::now();
        let daily = PeriodWindow::daily(now);
        let monthly = PeriodWindow::monthly(now);

        let raw = self.store.fetch_current(user_id, &daily, &monthly).await?;

        Ok(Self::assemble_stats(tier, &daily, &monthly, &raw))
    }

    /// Record one occurrence of a billable action in its current window.
    pub async fn increment_usage(
        &self,
        user_id: Uuid,
        action: UsageAction,
        tier: Tier,
    ) -> Result<()> {
        let window = action.period_kind().window_at(Utc::now());
        self.store.increment(user_id, action, tier, &window).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Pure assembly of the stats payload from one raw snapshot. Portfolio
    /// changes are counted in the store but intentionally not projected
    /// into usage, percentages, or warnings.
    pub fn assemble_stats(
        tier: Tier,
        daily_window: &PeriodWindow,
        monthly_window: &PeriodWindow,
        raw: &RawUsageCounters,
    ) -> UsageStats {
        let limits = TierLimits::for_tier(tier);

        let chat_used = raw.daily.as_ref().map_or(0, |r| r.chat_queries);
        let analysis_used = raw.daily.as_ref().map_or(0, |r| r.portfolio_analysis);
        let filings_used = raw.monthly.as_ref().map_or(0, |r| r.sec_filings);

        let chat_pct = limits.chat_queries_per_day.percent_used(chat_used);
        let analysis_pct = limits.portfolio_analysis_per_day.percent_used(analysis_used);
        let filings_pct = limits.sec_filings_per_month.percent_used(filings_used);

        UsageStats {
            tier,
            usage: UsageBreakdown {
                daily: DailyUsage {
                    chat_queries: metric(limits.chat_queries_per_day, chat_used),
                    portfolio_analysis: metric(limits.portfolio_analysis_per_day, analysis_used),
                },
                monthly: MonthlyUsage {
                    sec_filings: metric(limits.sec_filings_per_month, filings_used),
                },
            },
            periods: StatsPeriods {
                daily: *daily_window,
                monthly: *monthly_window,
            },
            percentages: QuotaPercentages {
                chat_queries: chat_pct,
                portfolio_analysis: analysis_pct,
                sec_filings: filings_pct,
            },
            warnings: QuotaWarnings {
                chat_queries: chat_pct >= WARNING_THRESHOLD_PCT,
                portfolio_analysis: analysis_pct >= WARNING_THRESHOLD_PCT,
                sec_filings: filings_pct >= WARNING_THRESHOLD_PCT,
            },
        }
    }
}

fn metric(limit: Limit, used: i64) -> UsageMetric {
    UsageMetric {
        used,
        limit,
        remaining: limit.remaining(used),
    }
}
