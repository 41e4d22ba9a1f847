use anyhow::Result;
use moka::future::Cache;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Two-tier cache: in-process moka in front of an optional Redis.
pub struct CacheService {
    redis: Option<redis::aio::ConnectionManager>,
    redis_configured: bool,
    memory: Arc<Cache<String, String>>,
}

impl CacheService {
    pub async fn new(redis_url: Option<&str>, memory_ttl: Duration) -> Self {
        let redis = match redis_url {
            Some(url) => Self::connect(url).await,
            None => {
                tracing::info!("No REDIS_URL configured, using memory cache only");
                None
            }
        };

        Self {
            redis,
            redis_configured: redis_url.is_some(),
            memory: Arc::new(Self::memory_cache(memory_ttl)),
        }
    }

    pub fn memory_only(memory_ttl: Duration) -> Self {
        Self {
            redis: None,
            redis_configured: false,
            memory: Arc::new(Self::memory_cache(memory_ttl)),
        }
    }

    fn memory_cache(ttl: Duration) -> Cache<String, String> {
        Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build()
    }

    async fn connect(url: &str) -> Option<redis::aio::ConnectionManager> {
        match redis::Client::open(url) {
            Ok(client) => match client.get_connection_manager().await {
                Ok(conn) => {
                    tracing::info!("Redis connected successfully");
                    Some(conn)
                }
                Err(e) => {
                    tracing::warn!("Redis connection failed: {}, using memory cache only", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Redis client creation failed: {}, using memory cache only", e);
                None
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if let Some(cached) = self.memory.get(key).await {
            if let Ok(value) = serde_json::from_str(&cached) {
                tracing::debug!("Memory cache hit for key: {}", key);
                return Ok(Some(value));
            }
        }

        if let Some(mut redis) = self.redis.clone() {
            match redis.get::<_, Option<String>>(key).await {
                Ok(Some(cached)) => {
                    if let Ok(value) = serde_json::from_str(&cached) {
                        self.memory.insert(key.to_string(), cached).await;
                        tracing::debug!("Redis cache hit for key: {}", key);
                        return Ok(Some(value));
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Redis get error: {}", e),
            }
        }

        tracing::debug!("Cache miss for key: {}", key);
        Ok(None)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let serialized = serde_json::to_string(value)?;

        self.memory.insert(key.to_string(), serialized.clone()).await;

        if let Some(mut redis) = self.redis.clone() {
            if let Err(e) = redis.set_ex::<_, _, ()>(key, serialized, ttl_secs).await {
                tracing::warn!("Redis set error: {}", e);
            } else {
                tracing::debug!("Cached key: {} with TTL: {}s", key, ttl_secs);
            }
        }

        Ok(())
    }

    pub async fn invalidate(&self, key: &str) {
        self.memory.invalidate(key).await;

        if let Some(mut redis) = self.redis.clone() {
            if let Err(e) = redis.del::<_, ()>(key).await {
                tracing::warn!("Redis delete error: {}", e);
            }
        }
    }

    /// `None` when no Redis was configured. A configured Redis that never
    /// connected reports `Some(false)`.
    pub async fn ping(&self) -> Option<bool> {
        if !self.redis_configured {
            return None;
        }
        let Some(mut redis) = self.redis.clone() else {
            return Some(false);
        };
        Some(
            redis::cmd("PING")
                .query_async::<_, String>(&mut redis)
                .await
                .is_ok(),
        )
    }
}
