use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;

/// Key-value cache with per-entry TTLs, the shape a redis driver would
/// implement. Values are serialized JSON strings.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64)
        -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Deletes every key matching a glob pattern with a single `*` wildcard.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;
    async fn mset(
        &self,
        entries: &[(String, String)],
        ttl_seconds: u64,
    ) -> Result<()>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-process cache implementation. Expired entries are dropped lazily on
/// read and on pattern deletion.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn glob_matches(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        None => pattern == key,
    }
}

#[async_trait]
impl CacheRepository for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.live())
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_owned(),
            CacheEntry {
                value: value.to_owned(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, entry| {
            entry.live() && !glob_matches(pattern, key)
        });
        Ok(before - entries.len())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(CacheEntry::live).unwrap_or(false))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key)
                    .filter(|entry| entry.live())
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn mset(
        &self,
        pairs: &[(String, String)],
        ttl_seconds: u64,
    ) -> Result<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        let mut entries = self.entries.write().await;
        for (key, value) in pairs {
            entries.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }
}
