pub mod resolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::tier::Tier;
use crate::utils::error::MeteringError;

/// One verified purchase transaction. Records accumulate over time and are
/// never deleted; the active tier is always derived from a live scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub product_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Set when a later transaction upgraded away from this one.
    pub is_upgraded: bool,
}

impl EntitlementRecord {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            expires_at: None,
            revoked_at: None,
            is_upgraded: false,
        }
    }

    /// Not revoked, not expired as of `now`, not superseded by an upgrade.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none()
            && !self.is_upgraded
            && self.expires_at.map_or(true, |exp| exp > now)
    }

    pub fn tier(&self) -> Option<Tier> {
        Tier::from_product_id(&self.product_id)
    }
}

#[derive(Debug, Clone)]
pub enum TransactionUpdate {
    Purchased(EntitlementRecord),
    Revoked { product_id: String },
}

/// Platform purchase ledger: an enumerable, verifiable set of transactions
/// plus a push stream of new transaction events.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    async fn verified_transactions(&self) -> Result<Vec<EntitlementRecord>, MeteringError>;

    fn updates(&self) -> broadcast::Receiver<TransactionUpdate>;
}
