mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use common::{PRODUCT_ID_MONTHLY, PRODUCT_ID_YEARLY, ScriptedLedger};
use lenspass::entitlements::resolver::EntitlementResolver;
use lenspass::types::tier::Tier;
use lenspass::utils::error::MeteringError;

#[tokio::test]
async fn simultaneous_monthly_and_yearly_resolve_to_yearly() {
    let transactions = Arc::new(ScriptedLedger::with_products(&[
        PRODUCT_ID_MONTHLY,
        PRODUCT_ID_YEARLY,
    ]));
    let resolver = EntitlementResolver::new(transactions);

    assert_eq!(resolver.current_tier().await.unwrap(), Tier::Yearly);
}

#[tokio::test]
async fn outage_after_a_successful_scan_serves_the_cached_tier() {
    let transactions = Arc::new(ScriptedLedger::with_products(&[PRODUCT_ID_YEARLY]));
    let resolver = EntitlementResolver::new(transactions.clone());

    assert_eq!(resolver.current_tier().await.unwrap(), Tier::Yearly);

    transactions.set_fail(true);
    assert_eq!(resolver.current_tier().await.unwrap(), Tier::Yearly);
}

#[tokio::test]
async fn outage_with_no_prior_verification_propagates() {
    let transactions = Arc::new(ScriptedLedger::empty());
    transactions.set_fail(true);
    let resolver = EntitlementResolver::new(transactions);

    assert!(matches!(
        resolver.current_tier().await,
        Err(MeteringError::VerificationFailed(_))
    ));
}

#[tokio::test]
async fn purchase_event_drives_a_tier_change_notification() {
    let transactions = Arc::new(ScriptedLedger::empty());
    let resolver = Arc::new(EntitlementResolver::new(transactions.clone()));
    let task = resolver.spawn_refresh_task();
    let mut tiers = resolver.subscribe();

    assert_eq!(*tiers.borrow(), Tier::Free);

    transactions.purchase(PRODUCT_ID_YEARLY);

    timeout(Duration::from_secs(1), tiers.changed())
        .await
        .expect("no tier change within 1s")
        .unwrap();
    assert_eq!(*tiers.borrow(), Tier::Yearly);

    task.abort();
}

#[tokio::test]
async fn upgrade_mid_window_promotes_without_demoting_first() {
    let transactions = Arc::new(ScriptedLedger::with_products(&[PRODUCT_ID_MONTHLY]));
    let resolver = EntitlementResolver::new(transactions.clone());

    assert_eq!(resolver.current_tier().await.unwrap(), Tier::Monthly);

    // Upgrade window: the yearly transaction lands while the monthly one is
    // still live. The scan must prefer the higher tier.
    transactions.purchase(PRODUCT_ID_YEARLY);
    assert_eq!(resolver.current_tier().await.unwrap(), Tier::Yearly);
}
