use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, info, warn};

use crate::entitlements::{EntitlementRecord, TransactionLedger};
use crate::types::tier::Tier;
use crate::utils::error::MeteringError;

/// Derives the currently-active tier from the purchase transaction ledger.
///
/// Pure query with no persisted side effect. The last successfully verified
/// tier is kept in memory so a transient ledger outage never demotes a paying
/// user; only a failure with nothing to fall back on propagates.
pub struct EntitlementResolver {
    ledger: Arc<dyn TransactionLedger>,
    last_verified: RwLock<Option<Tier>>,
    tier_tx: watch::Sender<Tier>,
}

impl EntitlementResolver {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        let (tier_tx, _) = watch::channel(Tier::Free);
        Self {
            ledger,
            last_verified: RwLock::new(None),
            tier_tx,
        }
    }

    /// Tier-change notifications, e.g. for refreshing a paywall.
    pub fn subscribe(&self) -> watch::Receiver<Tier> {
        self.tier_tx.subscribe()
    }

    pub async fn current_tier(&self) -> Result<Tier, MeteringError> {
        match self.ledger.verified_transactions().await {
            Ok(records) => {
                let tier = resolve_tier(&records, Utc::now());
                self.remember(tier).await;
                Ok(tier)
            }
            Err(e) => match *self.last_verified.read().await {
                Some(tier) => {
                    warn!(
                        error = %e,
                        fallback = %tier,
                        "Transaction ledger unavailable, serving last verified tier"
                    );
                    Ok(tier)
                }
                None => {
                    error!(error = %e, "Transaction ledger unavailable with no prior verification");
                    Err(MeteringError::VerificationFailed(e.to_string()))
                }
            },
        }
    }

    async fn remember(&self, tier: Tier) {
        let changed = {
            let mut last = self.last_verified.write().await;
            let changed = *last != Some(tier);
            *last = Some(tier);
            changed
        };
        if changed {
            info!(tier = %tier, "Active tier changed");
            let _ = self.tier_tx.send(tier);
        }
    }

    /// Consume the ledger's push stream and re-derive the tier on every
    /// transaction event. Runs until the stream closes or the task is aborted.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let resolver = Arc::clone(self);
        let updates = self.ledger.updates();
        tokio::spawn(async move {
            let mut stream = BroadcastStream::new(updates);
            while let Some(event) = stream.next().await {
                match event {
                    Ok(update) => {
                        debug!(update = ?update, "Transaction update received");
                        if let Err(e) = resolver.current_tier().await {
                            warn!(error = %e, "Tier refresh after transaction update failed");
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        // Re-scan on the next event; the scan is total anyway
                        warn!(skipped, "Transaction update stream lagged");
                    }
                }
            }
            info!("Transaction update stream closed");
        })
    }
}

/// Highest-precedence tier among surviving transactions. A mid-upgrade window
/// holds both a Monthly and a Yearly record; taking the max keeps the user on
/// the better tier instead of spuriously demoting them.
fn resolve_tier(records: &[EntitlementRecord], now: DateTime<Utc>) -> Tier {
    records
        .iter()
        .filter(|r| r.is_live(now))
        .filter_map(|r| r.tier())
        .max()
        .unwrap_or(Tier::Free)
}
