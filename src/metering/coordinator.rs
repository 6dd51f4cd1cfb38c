use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::entitlements::resolver::EntitlementResolver;
use crate::ledger::{QuotaDecision, QuotaLedger, QuotaSnapshot};
use crate::metering::identity::{IdentityProvider, anonymous_user_id, resolve_user_id};
use crate::utils::error::MeteringError;
use crate::utils::logs_fmt::abbrev;

/// UI-facing outcome of one metered-action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeteredOutcome {
    /// Go ahead; one unit was consumed.
    Proceed { remaining: u32 },
    /// Free tier: the capability is gated behind a paid tier.
    NeedsUpgrade,
    /// Monthly allowance exhausted.
    LimitReached,
    /// Entitlement or quota state could not be verified. Fail-closed.
    VerificationFailed,
}

/// Composes tier resolution and quota consumption into one outcome.
///
/// `request_metered_action` is not idempotent: every `Proceed` consumed one
/// unit, so callers invoke it exactly once per user-intended action, never
/// speculatively.
pub struct MeteringCoordinator {
    resolver: Arc<EntitlementResolver>,
    ledger: QuotaLedger,
    identity: Arc<dyn IdentityProvider>,
}

impl MeteringCoordinator {
    pub fn new(
        resolver: Arc<EntitlementResolver>,
        ledger: QuotaLedger,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            identity,
        }
    }

    #[instrument(skip(self))]
    pub async fn request_metered_action(&self) -> MeteredOutcome {
        let user_id = self.current_user_id();

        let tier = match self.resolver.current_tier().await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(error = %e, "Failing closed: tier could not be resolved");
                return MeteredOutcome::VerificationFailed;
            }
        };

        match self.ledger.check_and_consume(&user_id, tier).await {
            Ok(QuotaDecision::Allowed { remaining }) => MeteredOutcome::Proceed { remaining },
            Ok(QuotaDecision::NotMetered) => MeteredOutcome::NeedsUpgrade,
            Ok(QuotaDecision::QuotaExceeded { used, limit }) => {
                info!(user = %abbrev(&user_id), used, limit, "Monthly limit reached");
                MeteredOutcome::LimitReached
            }
            Err(e) => {
                warn!(user = %abbrev(&user_id), error = %e, "Failing closed: quota check failed");
                MeteredOutcome::VerificationFailed
            }
        }
    }

    /// Read-only usage view for the current user; never consumes.
    pub async fn peek(&self) -> Result<QuotaSnapshot, MeteringError> {
        let user_id = self.current_user_id();
        let tier = self.resolver.current_tier().await?;
        self.ledger.peek(&user_id, tier).await
    }

    fn current_user_id(&self) -> String {
        match resolve_user_id(self.identity.as_ref()) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %abbrev(anonymous_user_id()),
                    "No signed-in user, metering against anonymous identity"
                );
                anonymous_user_id().to_string()
            }
        }
    }
}
