use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{OfflineError, Response};

/// A cached response plus the freshness stamp written when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub response: Response,
    pub stored_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Entry stamped with the current time
    pub fn stamped(response: Response) -> Self {
        Self {
            response,
            stored_at: Some(Utc::now()),
        }
    }

    /// Entry with no freshness stamp (manifest assets)
    pub fn unstamped(response: Response) -> Self {
        Self {
            response,
            stored_at: None,
        }
    }

    /// Fresh only when stamped and no older than `max_age`.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.stored_at {
            Some(stored_at) => now - stored_at <= max_age,
            None => false,
        }
    }
}

/// Named buckets of cached responses keyed by request URL.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn bucket_names(&self) -> Result<Vec<String>, OfflineError>;

    /// Create the bucket if it does not exist yet.
    async fn open(&self, bucket: &str) -> Result<(), OfflineError>;

    /// Returns true when a bucket was removed.
    async fn delete_bucket(&self, bucket: &str) -> Result<bool, OfflineError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>, OfflineError>;

    /// Insert or overwrite. Creates the bucket when missing.
    async fn put(&self, bucket: &str, key: &str, entry: CacheEntry) -> Result<(), OfflineError>;
}

/// In-process storage. Concurrent writers to one key: last write wins.
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn bucket_names(&self) -> Result<Vec<String>, OfflineError> {
        let mut names: Vec<String> = self.buckets.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn open(&self, bucket: &str) -> Result<(), OfflineError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool, OfflineError> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>, OfflineError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: &str, entry: CacheEntry) -> Result<(), OfflineError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }
}
