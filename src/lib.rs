pub mod entitlements;
pub mod ledger;
pub mod metering;
pub mod store;
pub mod types;
pub mod utils;

pub use entitlements::resolver::EntitlementResolver;
pub use entitlements::{EntitlementRecord, TransactionLedger, TransactionUpdate};
pub use ledger::{QuotaDecision, QuotaLedger, QuotaSnapshot};
pub use metering::coordinator::{MeteredOutcome, MeteringCoordinator};
pub use metering::identity::IdentityProvider;
pub use metering::stack::MeteringStack;
pub use types::counter::QuotaCounter;
pub use types::tier::Tier;
pub use utils::config::MeteringConfig;
pub use utils::error::MeteringError;
