use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::{QuotaStore, StoreError};
use crate::types::counter::QuotaCounter;

/// In-process document store for tests and offline development.
///
/// Documents are raw JSON objects so merge-write semantics match the real
/// store: keys absent from an incoming write survive in the stored document.
#[derive(Default)]
pub struct MemoryQuotaStore {
    docs: RwLock<HashMap<String, Value>>,
    loads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, malformed fields and all.
    pub async fn insert_raw(&self, user_id: &str, doc: Value) {
        self.docs.write().await.insert(user_id.to_string(), doc);
    }

    pub async fn raw(&self, user_id: &str) -> Option<Value> {
        self.docs.read().await.get(user_id).cloned()
    }

    pub async fn doc_count(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn user_ids(&self) -> Vec<String> {
        self.docs.read().await.keys().cloned().collect()
    }

    /// Remote round-trips observed, for cache-coherence assertions.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn load(&self, user_id: &str) -> Result<Option<QuotaCounter>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let doc = match self.docs.read().await.get(user_id).cloned() {
            Some(doc) => doc,
            None => return Ok(None),
        };
        let counter =
            serde_json::from_value(doc).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Some(counter))
    }

    async fn merge_write(&self, user_id: &str, counter: &QuotaCounter) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let incoming = serde_json::to_value(counter)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        let mut docs = self.docs.write().await;
        let doc = docs
            .entry(user_id.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        match (doc, incoming) {
            (Value::Object(existing), Value::Object(fields)) => {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
            }
            (doc, incoming) => *doc = incoming,
        }
        Ok(())
    }
}
