//! Usage counter rows and the derived quota statistics served to callers.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::tier::{Limit, Tier};

/// A billable action tracked per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageAction {
    ChatQuery,
    PortfolioAnalysis,
    SecFiling,
    PortfolioChange,
}

impl UsageAction {
    /// Strict lookup for action names on the wire. Unknown names are a
    /// caller error, unlike tier names which fall back to free.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "chat_query" => Some(UsageAction::ChatQuery),
            "portfolio_analysis" => Some(UsageAction::PortfolioAnalysis),
            "sec_filing" => Some(UsageAction::SecFiling),
            "portfolio_change" => Some(UsageAction::PortfolioChange),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageAction::ChatQuery => "chat_query",
            UsageAction::PortfolioAnalysis => "portfolio_analysis",
            UsageAction::SecFiling => "sec_filing",
            UsageAction::PortfolioChange => "portfolio_change",
        }
    }

    /// SEC filing views reset monthly, everything else daily.
    pub fn period_kind(&self) -> PeriodKind {
        match self {
            UsageAction::SecFiling => PeriodKind::Monthly,
            _ => PeriodKind::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Daily,
    Monthly,
}

impl PeriodKind {
    pub fn window_at(&self, at: DateTime<Utc>) -> PeriodWindow {
        match self {
            PeriodKind::Daily => PeriodWindow::daily(at),
            PeriodKind::Monthly => PeriodWindow::monthly(at),
        }
    }
}

/// An inclusive UTC window that counters accumulate within. Both bounds
/// identify the row, so two instants in the same window always address the
/// same counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    /// Calendar day containing `at`: midnight through 23:59:59.999 UTC.
    pub fn daily(at: DateTime<Utc>) -> Self {
        let day = at.date_naive();
        Self {
            start: day.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            end: day.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc(),
        }
    }

    /// Calendar month containing `at`. The last day comes from stepping to
    /// the first of the next month and back one day, which keeps leap
    /// February and 30/31-day months correct.
    pub fn monthly(at: DateTime<Utc>) -> Self {
        let day = at.date_naive();
        let first = NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap();
        let next_month = if day.month() == 12 {
            NaiveDate::from_ymd_opt(day.year() + 1, 1, 1).unwrap()
        } else {
            NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1).unwrap()
        };
        let last = next_month.pred_opt().unwrap();
        Self {
            start: first.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            end: last.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc(),
        }
    }
}

/// One persisted counter row. The tier is a snapshot taken when the row is
/// first created and is never re-synced afterwards.
#[derive(Debug, Clone)]
pub struct UsageCounterRecord {
    pub user_id: Uuid,
    pub tier: Tier,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub chat_queries: i64,
    pub portfolio_analysis: i64,
    pub sec_filings: i64,
    pub portfolio_changes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageCounterRecord {
    pub fn new(user_id: Uuid, tier: Tier, window: &PeriodWindow) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            tier,
            period_start: window.start,
            period_end: window.end,
            chat_queries: 0,
            portfolio_analysis: 0,
            sec_filings: 0,
            portfolio_changes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, action: UsageAction) {
        match action {
            UsageAction::ChatQuery => self.chat_queries += 1,
            UsageAction::PortfolioAnalysis => self.portfolio_analysis += 1,
            UsageAction::SecFiling => self.sec_filings += 1,
            UsageAction::PortfolioChange => self.portfolio_changes += 1,
        }
        self.updated_at = Utc::now();
    }
}

// Hand-rolled so the tier column can decode through the lenient name lookup
// instead of a database enum type.
impl FromRow<'_, PgRow> for UsageCounterRecord {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let tier: String = row.try_get("tier")?;
        Ok(Self {
            user_id: row.try_get("user_id")?,
            tier: Tier::from_name(&tier),
            period_start: row.try_get("period_start")?,
            period_end: row.try_get("period_end")?,
            chat_queries: row.try_get("chat_queries")?,
            portfolio_analysis: row.try_get("portfolio_analysis")?,
            sec_filings: row.try_get("sec_filings")?,
            portfolio_changes: row.try_get("portfolio_changes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Raw counter snapshot for one user at one instant. `None` means no row
/// exists yet for that window, which reads as zero usage.
#[derive(Debug, Clone, Default)]
pub struct RawUsageCounters {
    pub daily: Option<UsageCounterRecord>,
    pub monthly: Option<UsageCounterRecord>,
}

/// One quota presented to callers. Derived on every read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageMetric {
    pub used: i64,
    pub limit: Limit,
    pub remaining: Limit,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyUsage {
    pub chat_queries: UsageMetric,
    pub portfolio_analysis: UsageMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyUsage {
    pub sec_filings: UsageMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageBreakdown {
    pub daily: DailyUsage,
    pub monthly: MonthlyUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsPeriods {
    pub daily: PeriodWindow,
    pub monthly: PeriodWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaPercentages {
    pub chat_queries: f64,
    pub portfolio_analysis: f64,
    pub sec_filings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaWarnings {
    pub chat_queries: bool,
    pub portfolio_analysis: bool,
    pub sec_filings: bool,
}

/// Full statistics payload for one user. The tier echoes what the caller
/// supplied, not whatever snapshot the counter rows hold.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageStats {
    pub tier: Tier,
    pub usage: UsageBreakdown,
    pub periods: StatsPeriods,
    pub percentages: QuotaPercentages,
    pub warnings: QuotaWarnings,
}
