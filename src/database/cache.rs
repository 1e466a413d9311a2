//! Result Cache
//!
//! Answers are cached by `<backend>:<question>`. A bounded in-process store
//! sits in front of an optional shared store (Redis); values are kept as the
//! exact serialized JSON text so repeated answers are byte-identical.

use crate::database::connection::DatabaseBackend;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of entries kept in process
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Build the cache key for a question against a backend (exact text, no normalization)
pub fn cache_key(backend: DatabaseBackend, question: &str) -> String {
    format!("{}:{}", backend.name(), question)
}

/// Key/value store shared between service instances
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Shared Redis store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis (e.g. `redis://localhost:6379/0`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }
}

/// Two-level result cache: bounded local store, then optional shared store
#[derive(Clone)]
pub struct ResultCache {
    local: Cache<String, String>,
    remote: Option<Arc<dyn SharedStore>>,
}

impl ResultCache {
    /// Create a cache with a local capacity bound and an optional shared store
    pub fn new(capacity: u64, remote: Option<Arc<dyn SharedStore>>) -> Self {
        info!(
            capacity,
            shared = remote.is_some(),
            "initializing result cache"
        );
        Self {
            local: Cache::builder().max_capacity(capacity).build(),
            remote,
        }
    }

    /// In-process only cache
    pub fn in_memory(capacity: u64) -> Self {
        Self::new(capacity, None)
    }

    /// Look up a serialized result
    ///
    /// A shared-store hit is copied into the local store.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.local.get(key).await {
            debug!(key, "local cache hit");
            return Ok(Some(value));
        }

        let Some(remote) = &self.remote else {
            return Ok(None);
        };

        let value = remote.get(key).await?;
        if let Some(ref value) = value {
            debug!(key, "shared cache hit");
            self.local.insert(key.to_string(), value.clone()).await;
        }
        Ok(value)
    }

    /// Store a serialized result in every level
    ///
    /// The local entry is written even when the shared store rejects the value;
    /// the shared-store error is still returned.
    pub async fn put(&self, key: &str, value: String) -> Result<()> {
        self.local.insert(key.to_string(), value.clone()).await;
        if let Some(remote) = &self.remote {
            remote.set(key, &value).await?;
        }
        Ok(())
    }

    /// Approximate number of locally cached entries
    pub async fn local_entry_count(&self) -> u64 {
        self.local.run_pending_tasks().await;
        self.local.entry_count()
    }

    /// Whether a shared store is attached
    pub fn is_shared(&self) -> bool {
        self.remote.is_some()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::in_memory(DEFAULT_CAPACITY)
    }
}
