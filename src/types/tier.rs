use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::constants::{PRODUCT_ID_MONTHLY, PRODUCT_ID_YEARLY};

/// Subscription level governing the monthly allowance of metered actions.
///
/// Variant order is precedence order: when several entitlements are live at
/// once (mid-upgrade window), the highest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Monthly,
    Yearly,
}

impl Tier {
    /// Metered actions permitted per calendar month.
    pub const fn monthly_allowance(&self) -> u32 {
        match self {
            Tier::Free => 0,
            Tier::Monthly => 120,
            Tier::Yearly => 150,
        }
    }

    pub fn from_product_id(product_id: &str) -> Option<Tier> {
        match product_id {
            PRODUCT_ID_MONTHLY => Some(Tier::Monthly),
            PRODUCT_ID_YEARLY => Some(Tier::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Monthly => "monthly",
            Tier::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
