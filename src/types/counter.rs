use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::tier::Tier;

/// Per-user usage counter, persisted in the remote document store and cached
/// in-process. Mutated only by the quota ledger.
///
/// Wire names are camelCase; the `tier` field is an audit stamp of the tier
/// under which the last consume happened, never an authority on entitlement.
/// Deserialization is deliberately lenient: we own this schema, so a mangled
/// field degrades to its bootstrap value instead of bricking the feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaCounter {
    #[serde(rename = "tier", default, deserialize_with = "lenient_label")]
    pub last_known_tier: String,

    #[serde(rename = "monthlyUsed", default, deserialize_with = "lenient_count")]
    pub monthly_used: u32,

    #[serde(
        rename = "lastReset",
        default = "Utc::now",
        deserialize_with = "lenient_instant"
    )]
    pub last_reset_at: DateTime<Utc>,

    #[serde(
        rename = "createdAt",
        default = "Utc::now",
        deserialize_with = "lenient_instant"
    )]
    pub created_at: DateTime<Utc>,

    #[serde(
        rename = "lastUpdatedAt",
        default = "Utc::now",
        deserialize_with = "lenient_instant"
    )]
    pub last_updated_at: DateTime<Utc>,
}

impl QuotaCounter {
    /// Fresh counter for a user seen for the first time.
    pub fn bootstrap(tier: Tier, now: DateTime<Utc>) -> Self {
        Self {
            last_known_tier: tier.as_str().to_string(),
            monthly_used: 0,
            last_reset_at: now,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// True when `last_reset_at` belongs to a different calendar month than
    /// `now`. Day-of-month never matters, only (year, month).
    pub fn needs_rollover(&self, now: DateTime<Utc>) -> bool {
        (self.last_reset_at.year(), self.last_reset_at.month()) != (now.year(), now.month())
    }

    /// Start a new monthly window. Must be persisted before any limit check.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        self.monthly_used = 0;
        self.last_reset_at = now;
        self.last_updated_at = now;
    }
}

fn lenient_count<'de, D>(de: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(value
        .as_u64()
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0))
}

fn lenient_instant<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}

fn lenient_label<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}
