use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use utoipa::{
    openapi::{ObjectBuilder, OneOfBuilder, RefOr, Schema, SchemaType},
    ToSchema,
};

/// Subscription tier as resolved by the billing side of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
}

impl Tier {
    /// Lenient lookup for tier names coming from callers. Anything we do
    /// not recognize resolves to the free tier rather than an error.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "basic" => Tier::Basic,
            "premium" => Tier::Premium,
            _ => Tier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }
}

/// A quota ceiling. Kept as a tagged variant instead of a numeric sentinel
/// so unlimited tiers cannot leak into arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Finite(u32),
    Unlimited,
}

impl Limit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Actions left before the ceiling, floored at zero. Unlimited stays
    /// unlimited.
    pub fn remaining(&self, used: i64) -> Limit {
        match self {
            Limit::Unlimited => Limit::Unlimited,
            Limit::Finite(max) => {
                let left = i64::from(*max) - used;
                Limit::Finite(left.max(0) as u32)
            }
        }
    }

    /// Share of the ceiling consumed, capped at 100. Unlimited reports
    /// exactly 0 regardless of use.
    pub fn percent_used(&self, used: i64) -> f64 {
        match self {
            Limit::Unlimited => 0.0,
            Limit::Finite(0) => {
                if used > 0 {
                    100.0
                } else {
                    0.0
                }
            }
            Limit::Finite(max) => (used as f64 * 100.0 / f64::from(*max)).min(100.0),
        }
    }
}

// Serializes as a plain number or the string "unlimited" so API consumers
// never see a magic sentinel value.
impl Serialize for Limit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Limit::Finite(n) => serializer.serialize_u32(*n),
            Limit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LimitVisitor;

        impl Visitor<'_> for LimitVisitor {
            type Value = Limit;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative integer or the string \"unlimited\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Limit, E> {
                u32::try_from(value)
                    .map(Limit::Finite)
                    .map_err(|_| E::custom("limit out of range"))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Limit, E> {
                u32::try_from(value)
                    .map(Limit::Finite)
                    .map_err(|_| E::custom("limit out of range"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Limit, E> {
                if value == "unlimited" {
                    Ok(Limit::Unlimited)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_any(LimitVisitor)
    }
}

impl<'s> ToSchema<'s> for Limit {
    fn schema() -> (&'s str, RefOr<Schema>) {
        (
            "Limit",
            RefOr::T(Schema::OneOf(
                OneOfBuilder::new()
                    .description(Some(
                        "Maximum number of actions for the period, or \"unlimited\"",
                    ))
                    .item(Schema::Object(
                        ObjectBuilder::new().schema_type(SchemaType::Integer).build(),
                    ))
                    .item(Schema::Object(
                        ObjectBuilder::new()
                            .schema_type(SchemaType::String)
                            .enum_values(Some(["unlimited"]))
                            .build(),
                    ))
                    .build(),
            )),
        )
    }
}

/// Per-tier quota schedule. Code-level configuration, not stored alongside
/// the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub chat_queries_per_day: Limit,
    pub portfolio_analysis_per_day: Limit,
    pub portfolio_changes_per_day: Limit,
    pub sec_filings_per_month: Limit,
}

impl TierLimits {
    /// Get the limits for a specific tier.
    ///
    /// | Tier | Chat/day | Analysis/day | Changes/day | Filings/month |
    /// |------|----------|--------------|-------------|---------------|
    /// | Free | 10 | 5 | 20 | 10 |
    /// | Basic | 100 | 50 | 100 | 100 |
    /// | Premium | Unlimited | Unlimited | Unlimited | Unlimited |
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                chat_queries_per_day: Limit::Finite(10),
                portfolio_analysis_per_day: Limit::Finite(5),
                portfolio_changes_per_day: Limit::Finite(20),
                sec_filings_per_month: Limit::Finite(10),
            },
            Tier::Basic => Self {
                chat_queries_per_day: Limit::Finite(100),
                portfolio_analysis_per_day: Limit::Finite(50),
                portfolio_changes_per_day: Limit::Finite(100),
                sec_filings_per_month: Limit::Finite(100),
            },
            Tier::Premium => Self {
                chat_queries_per_day: Limit::Unlimited,
                portfolio_analysis_per_day: Limit::Unlimited,
                portfolio_changes_per_day: Limit::Unlimited,
                sec_filings_per_month: Limit::Unlimited,
            },
        }
    }
}
