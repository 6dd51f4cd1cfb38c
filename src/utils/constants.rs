// Store product identifiers for the paid tiers
pub const PRODUCT_ID_MONTHLY: &str = "app.lenspass.pro.monthly";
pub const PRODUCT_ID_YEARLY: &str = "app.lenspass.pro.yearly";

/// Warn once remaining quota for a user drops below this
pub const LOW_QUOTA_WARN_THRESHOLD: u32 = 10;
