pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::types::counter::QuotaCounter;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("counter store unreachable: {0}")]
    Unreachable(String),
    #[error("counter store timed out")]
    Timeout,
    #[error("counter store error: HTTP {0}")]
    Api(u16),
    #[error("malformed counter document: {0}")]
    Parse(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unreachable(_) | StoreError::Timeout | StoreError::Api(500..=599)
        )
    }
}

/// Remote document store holding one counter document per user id.
///
/// Writes are merge-writes: fields absent from `counter`'s serialized form are
/// preserved in the stored document, and each write is atomic per document.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// `Ok(None)` means no document exists for this user yet.
    async fn load(&self, user_id: &str) -> Result<Option<QuotaCounter>, StoreError>;

    async fn merge_write(&self, user_id: &str, counter: &QuotaCounter) -> Result<(), StoreError>;
}
