use crate::models::{Investor, Startup};
use crate::services::entity_store::{EntityStore, EntityStoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_L1_SIZE: u64 = 10_000;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis, shared across instances, and
/// optional: without a Redis URL the manager runs on L1 alone.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager, connecting to Redis when a URL is given
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(manager)))
            }
            None => None,
        };

        Ok(Self {
            redis,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// In-process cache only
    pub fn local(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_l2(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        let Some(redis) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Ok(None);
        };

        let mut conn = redis.lock().await;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        drop(conn);

        match value {
            Some(json) => {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Set a value in cache (both tiers)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;
        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("DEL").arg(key).query_async(&mut *conn).await?;
        }
        Ok(())
    }

    /// Round-trip to Redis, `true` when L2 is absent
    pub async fn ping(&self) -> bool {
        let Some(redis) = &self.redis else {
            return true;
        };
        let mut conn = redis.lock().await;
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut *conn).await;
        pong.is_ok()
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub fn startup(id: &str) -> String {
        format!("hotmatch:startup:{}", id)
    }

    pub fn investor(id: &str) -> String {
        format!("hotmatch:investor:{}", id)
    }

    pub fn startup_roster() -> String {
        "hotmatch:roster:startups".to_string()
    }

    pub fn investor_roster() -> String {
        "hotmatch:roster:investors".to_string()
    }
}

/// Read-through cache in front of an entity store
///
/// Cache failures are logged and fall through to the inner store, so a
/// Redis outage degrades latency but never correctness.
pub struct CachedEntityStore {
    inner: Arc<dyn EntityStore>,
    cache: Arc<CacheManager>,
}

impl CachedEntityStore {
    pub fn new(inner: Arc<dyn EntityStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    pub fn with_defaults(inner: Arc<dyn EntityStore>) -> Self {
        Self::new(inner, Arc::new(CacheManager::local(DEFAULT_L1_SIZE, DEFAULT_TTL_SECS)))
    }

    async fn cached<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

#[async_trait]
impl EntityStore for CachedEntityStore {
    async fn get_startup(&self, id: &str) -> Result<Option<Startup>, EntityStoreError> {
        let key = CacheKey::startup(id);
        if let Some(startup) = self.cached(&key).await {
            return Ok(Some(startup));
        }

        let startup = self.inner.get_startup(id).await?;
        if let Some(s) = &startup {
            self.store(&key, s).await;
        }
        Ok(startup)
    }

    async fn get_investor(&self, id: &str) -> Result<Option<Investor>, EntityStoreError> {
        let key = CacheKey::investor(id);
        if let Some(investor) = self.cached(&key).await {
            return Ok(Some(investor));
        }

        let investor = self.inner.get_investor(id).await?;
        if let Some(i) = &investor {
            self.store(&key, i).await;
        }
        Ok(investor)
    }

    async fn list_startups(&self) -> Result<Vec<Startup>, EntityStoreError> {
        let key = CacheKey::startup_roster();
        if let Some(roster) = self.cached(&key).await {
            return Ok(roster);
        }

        let roster = self.inner.list_startups().await?;
        self.store(&key, &roster).await;
        Ok(roster)
    }

    async fn list_investors(&self) -> Result<Vec<Investor>, EntityStoreError> {
        let key = CacheKey::investor_roster();
        if let Some(roster) = self.cached(&key).await {
            return Ok(roster);
        }

        let roster = self.inner.list_investors().await?;
        self.store(&key, &roster).await;
        Ok(roster)
    }

    async fn invalidate_rosters(&self) {
        for key in [CacheKey::startup_roster(), CacheKey::investor_roster()] {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!("Cache invalidation failed for {}: {}", key, e);
            }
        }
        self.inner.invalidate_rosters().await;
    }
}
