use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;

use crate::entitlements::TransactionLedger;
use crate::entitlements::resolver::EntitlementResolver;
use crate::ledger::QuotaLedger;
use crate::metering::coordinator::MeteringCoordinator;
use crate::metering::identity::IdentityProvider;
use crate::store::QuotaStore;
use crate::store::http::HttpQuotaStore;
use crate::utils::config::MeteringConfig;

/// Composition root: one logical instance of each service per running app,
/// explicitly constructed and injectable, with no hidden global state.
///
/// Owns the resolver's background refresh task; the task is aborted on drop.
pub struct MeteringStack {
    pub coordinator: Arc<MeteringCoordinator>,
    pub resolver: Arc<EntitlementResolver>,
    pub ledger: QuotaLedger,
    refresh_task: JoinHandle<()>,
}

impl MeteringStack {
    /// Wire the stack against the HTTP counter store from environment config.
    pub fn from_env(
        transactions: Arc<dyn TransactionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> anyhow::Result<Self> {
        let cfg = MeteringConfig::load().context("loading metering configuration")?;
        Ok(Self::build(&cfg, transactions, identity))
    }

    pub fn build(
        cfg: &MeteringConfig,
        transactions: Arc<dyn TransactionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let store = Arc::new(HttpQuotaStore::new(
            cfg.store_api_url.clone(),
            cfg.store_api_key.clone(),
            cfg.request_timeout(),
        ));
        Self::with_store(cfg, store, transactions, identity)
    }

    /// Same wiring with a caller-supplied store, e.g. an in-memory one.
    pub fn with_store(
        cfg: &MeteringConfig,
        store: Arc<dyn QuotaStore>,
        transactions: Arc<dyn TransactionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let ledger = QuotaLedger::new(store, cfg.cache_ttl(), cfg.cache_max_entries);
        let resolver = Arc::new(EntitlementResolver::new(transactions));
        let refresh_task = resolver.spawn_refresh_task();
        let coordinator = Arc::new(MeteringCoordinator::new(
            Arc::clone(&resolver),
            ledger.clone(),
            identity,
        ));
        Self {
            coordinator,
            resolver,
            ledger,
            refresh_task,
        }
    }

    /// Stop consuming transaction updates. In-flight ledger operations are
    /// unaffected; they run to completion on their own tasks.
    pub fn shutdown(&self) {
        self.refresh_task.abort();
    }
}

impl Drop for MeteringStack {
    fn drop(&mut self) {
        self.refresh_task.abort();
    }
}
