use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::store::{QuotaStore, StoreError};
use crate::types::counter::QuotaCounter;
use crate::types::tier::Tier;
use crate::utils::constants::LOW_QUOTA_WARN_THRESHOLD;
use crate::utils::error::MeteringError;
use crate::utils::logs_fmt::abbrev;

/// Outcome of a single check-and-consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// One unit consumed; `remaining` is what is left this month.
    Allowed { remaining: u32 },
    QuotaExceeded { used: u32, limit: u32 },
    /// The tier carries no allowance at all.
    NotMetered,
}

/// Read-only view of a user's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    counter: QuotaCounter,
    fetched_at: DateTime<Utc>,
}

/// Serialized per-user counter service over the remote document store.
///
/// Every read-modify-write runs under that user's gate, so two consume
/// attempts in one process can never interleave. Cross-device races are
/// bounded by the cache freshness window and self-correct on the next load;
/// the remote store stays authoritative.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
    cache: Cache<String, CacheEntry>,
    gates: Arc<StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>, cache_ttl: Duration, cache_max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_max_entries)
            .time_to_live(cache_ttl)
            .build();
        Self {
            store,
            cache,
            gates: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Decide whether one metered action may proceed for `user_id`, consuming
    /// one unit of quota when it does.
    ///
    /// The sequence runs on its own task so an abandoned caller cannot leave
    /// the remote counter and the local cache disagreeing mid-write; dropping
    /// the returned future only discards the result.
    pub async fn check_and_consume(
        &self,
        user_id: &str,
        tier: Tier,
    ) -> Result<QuotaDecision, MeteringError> {
        let ledger = self.clone();
        let user = user_id.to_string();
        tokio::spawn(async move {
            let gate = ledger.user_gate(&user);
            let _serialized = gate.lock().await;
            ledger.apply_check(&user, tier).await
        })
        .await
        .map_err(|e| MeteringError::Internal(format!("check-and-consume task failed: {e}")))?
    }

    /// Current window without consuming. Never persists anything; a counter
    /// from a prior month reads as a fresh window.
    pub async fn peek(&self, user_id: &str, tier: Tier) -> Result<QuotaSnapshot, MeteringError> {
        let now = Utc::now();
        let limit = tier.monthly_allowance();
        let used = match self.current_counter(user_id).await? {
            Some(counter) if !counter.needs_rollover(now) => counter.monthly_used.min(limit),
            _ => 0,
        };
        Ok(QuotaSnapshot {
            used,
            limit,
            remaining: limit - used,
        })
    }

    async fn apply_check(
        &self,
        user_id: &str,
        tier: Tier,
    ) -> Result<QuotaDecision, MeteringError> {
        let now = Utc::now();

        let mut counter = match self.current_counter(user_id).await? {
            Some(counter) => counter,
            None => {
                // Lazy bootstrap, persisted before any comparison. The store's
                // merge semantics keep a concurrent bootstrap from another
                // device from producing a second document.
                let counter = QuotaCounter::bootstrap(tier, now);
                self.persist(user_id, &counter, now).await?;
                debug!(user = %abbrev(user_id), "Bootstrapped quota counter");
                counter
            }
        };

        // Rollover must be applied and persisted before the limit check;
        // comparing against a stale month is wrong even for a rejection.
        let mut dirty = false;
        if counter.needs_rollover(now) {
            info!(
                user = %abbrev(user_id),
                last_reset = %counter.last_reset_at,
                "Monthly rollover"
            );
            counter.roll_over(now);
            dirty = true;
        }

        let limit = tier.monthly_allowance();

        if limit == 0 {
            // Free tier consumes nothing, but the bootstrap/rollover above
            // still happened so a later upgrade starts from a sane window.
            if dirty {
                self.persist(user_id, &counter, now).await?;
            }
            return Ok(QuotaDecision::NotMetered);
        }

        if counter.monthly_used >= limit {
            if dirty {
                self.persist(user_id, &counter, now).await?;
            }
            info!(
                user = %abbrev(user_id),
                used = counter.monthly_used,
                limit,
                "Quota exceeded"
            );
            return Ok(QuotaDecision::QuotaExceeded {
                used: counter.monthly_used,
                limit,
            });
        }

        counter.monthly_used += 1;
        counter.last_known_tier = tier.as_str().to_string();
        counter.last_updated_at = now;
        self.persist(user_id, &counter, now).await?;

        let remaining = limit - counter.monthly_used;
        if remaining < LOW_QUOTA_WARN_THRESHOLD {
            warn!(user = %abbrev(user_id), remaining, "Low quota");
        }
        debug!(
            user = %abbrev(user_id),
            used = counter.monthly_used,
            limit,
            "Consumed one metered unit"
        );
        Ok(QuotaDecision::Allowed { remaining })
    }

    async fn current_counter(&self, user_id: &str) -> Result<Option<QuotaCounter>, MeteringError> {
        if let Some(entry) = self.cache.get(user_id).await {
            debug!(
                user = %abbrev(user_id),
                age_ms = (Utc::now() - entry.fetched_at).num_milliseconds(),
                "Serving counter from cache"
            );
            return Ok(Some(entry.counter));
        }

        match self.store.load(user_id).await {
            Ok(found) => {
                if let Some(counter) = &found {
                    self.cache
                        .insert(
                            user_id.to_string(),
                            CacheEntry {
                                counter: counter.clone(),
                                fetched_at: Utc::now(),
                            },
                        )
                        .await;
                }
                Ok(found)
            }
            Err(StoreError::Parse(detail)) => {
                // We own this schema; rebuild instead of bricking the feature
                warn!(user = %abbrev(user_id), error = %detail, "Persisted counter unreadable, rebuilding");
                Ok(None)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(user = %abbrev(user_id), error = %e, "Counter load failed");
                } else {
                    error!(user = %abbrev(user_id), error = %e, "Counter load rejected");
                }
                Err(e.into())
            }
        }
    }

    /// Write-through: the cache entry is replaced in the same operation as the
    /// remote write, so a same-process read never sees the old value.
    async fn persist(
        &self,
        user_id: &str,
        counter: &QuotaCounter,
        now: DateTime<Utc>,
    ) -> Result<(), MeteringError> {
        self.store.merge_write(user_id, counter).await?;
        self.cache
            .insert(
                user_id.to_string(),
                CacheEntry {
                    counter: counter.clone(),
                    fetched_at: now,
                },
            )
            .await;
        Ok(())
    }

    fn user_gate(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().expect("user gate map poisoned");
        gates
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
