use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::utils::error::MeteringError;

/// Source of the current user identity. Supplied by the app shell; the core
/// never talks to the auth system directly.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

// Stable for the process lifetime, so a signed-out session meters against one
// consistent counter instead of minting a new one per call.
static ANONYMOUS_USER_ID: Lazy<String> = Lazy::new(|| format!("anon-{}", Uuid::new_v4()));

pub fn anonymous_user_id() -> &'static str {
    &ANONYMOUS_USER_ID
}

pub(crate) fn resolve_user_id(identity: &dyn IdentityProvider) -> Result<String, MeteringError> {
    identity
        .current_user_id()
        .ok_or(MeteringError::AuthenticationMissing)
}
