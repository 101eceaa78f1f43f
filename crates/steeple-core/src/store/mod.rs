//! Versioned cache namespaces of GET request -> response snapshots.
//!
//! A `CacheStore` holds any number of named namespaces. Two of them are
//! current at a time: `{product}-{version}` for the app shell and
//! `{product}-data-{version}` for remote-database responses. Every write
//! replaces the whole entry for its key; there is no merge.
//!
//! Implementations:
//! - `MemoryStore` keeps everything in process
//! - `DiskStore` persists one file per entry under a cache directory

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::request::{CacheKey, Response};

pub use disk::DiskStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the namespace if it does not exist yet.
    async fn open(&self, namespace: &str) -> Result<(), StoreError>;

    /// Names of all existing namespaces.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Drop a namespace with all its entries. Returns whether it existed.
    async fn delete(&self, namespace: &str) -> Result<bool, StoreError>;

    /// A miss, including a missing namespace, is `Ok(None)`.
    async fn match_in(&self, namespace: &str, key: &CacheKey)
        -> Result<Option<Response>, StoreError>;

    /// Upsert, creating the namespace on first write.
    async fn put(&self, namespace: &str, key: &CacheKey, response: &Response)
        -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
