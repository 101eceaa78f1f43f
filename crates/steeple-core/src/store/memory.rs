use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStore;
use crate::error::StoreError;
use crate::request::{CacheKey, Response};

type Namespace = BTreeMap<CacheKey, Response>;

/// In-process cache store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all namespaces.
    pub async fn entry_count(&self) -> usize {
        self.namespaces.read().await.values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, namespace: &str) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, StoreError> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    async fn match_in(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        namespace: &str,
        key: &CacheKey,
        response: &Response,
    ) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }
}
