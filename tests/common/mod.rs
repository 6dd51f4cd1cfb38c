#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use lenspass::entitlements::{EntitlementRecord, TransactionLedger, TransactionUpdate};
use lenspass::ledger::QuotaLedger;
use lenspass::metering::identity::IdentityProvider;
use lenspass::store::{QuotaStore, StoreError};
use lenspass::types::counter::QuotaCounter;
use lenspass::utils::config::MeteringConfig;
use lenspass::utils::error::MeteringError;

pub use lenspass::utils::constants::{PRODUCT_ID_MONTHLY, PRODUCT_ID_YEARLY};

/// Transaction ledger with a scriptable record set and a toggleable outage.
pub struct ScriptedLedger {
    records: Mutex<Vec<EntitlementRecord>>,
    fail: AtomicBool,
    tx: broadcast::Sender<TransactionUpdate>,
}

impl ScriptedLedger {
    pub fn with_products(products: &[&str]) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            records: Mutex::new(
                products
                    .iter()
                    .map(|p| EntitlementRecord::new(*p))
                    .collect(),
            ),
            fail: AtomicBool::new(false),
            tx,
        }
    }

    pub fn empty() -> Self {
        Self::with_products(&[])
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Record a purchase and push it over the update stream.
    pub fn purchase(&self, product_id: &str) {
        let record = EntitlementRecord::new(product_id);
        self.records.lock().unwrap().push(record.clone());
        let _ = self.tx.send(TransactionUpdate::Purchased(record));
    }
}

#[async_trait]
impl TransactionLedger for ScriptedLedger {
    async fn verified_transactions(&self) -> Result<Vec<EntitlementRecord>, MeteringError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MeteringError::VerificationFailed(
                "simulated ledger outage".to_string(),
            ));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    fn updates(&self) -> broadcast::Receiver<TransactionUpdate> {
        self.tx.subscribe()
    }
}

/// Counter store where every remote call fails.
pub struct FailingStore;

#[async_trait]
impl QuotaStore for FailingStore {
    async fn load(&self, _user_id: &str) -> Result<Option<QuotaCounter>, StoreError> {
        Err(StoreError::Unreachable("simulated outage".to_string()))
    }

    async fn merge_write(
        &self,
        _user_id: &str,
        _counter: &QuotaCounter,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unreachable("simulated outage".to_string()))
    }
}

pub struct StaticIdentity(pub Option<String>);

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

pub fn signed_in(user_id: &str) -> Arc<StaticIdentity> {
    Arc::new(StaticIdentity(Some(user_id.to_string())))
}

pub fn signed_out() -> Arc<StaticIdentity> {
    Arc::new(StaticIdentity(None))
}

pub fn ledger_with(store: Arc<dyn QuotaStore>) -> QuotaLedger {
    QuotaLedger::new(store, Duration::from_secs(15), 1_000)
}

pub fn test_config() -> MeteringConfig {
    MeteringConfig {
        store_api_url: "http://127.0.0.1:0".to_string(),
        store_api_key: None,
        cache_ttl_ms: 15_000,
        cache_max_entries: 1_000,
        request_timeout_ms: 1_000,
    }
}

pub fn counter_doc(tier: &str, used: i64, last_reset: DateTime<Utc>) -> Value {
    json!({
        "tier": tier,
        "monthlyUsed": used,
        "lastReset": last_reset.to_rfc3339(),
        "createdAt": last_reset.to_rfc3339(),
        "lastUpdatedAt": last_reset.to_rfc3339(),
    })
}
