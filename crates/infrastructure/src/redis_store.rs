//! Redis-backed key-value store implementation
//!
//! Provides the shared TTL store used by the distributed lock, the partition
//! markers and the progress channel. The lock release path relies on the
//! atomic compare-value-then-delete primitive implemented here as a Lua
//! script, so that a delayed release can never delete a key a newer holder
//! has since acquired.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use streamfleet_core::{FleetError, FleetResult, KvStore};

/// Atomically deletes a key only when its current value matches ARGV[1].
const DELETE_IF_EQUALS_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis key-value store with connection management and key prefixing
pub struct RedisKvStore {
    client: redis::Client,
    key_prefix: String,
    delete_if_equals: redis::Script,
}

impl RedisKvStore {
    /// Create a new Redis KV store and verify the connection with a PING
    pub async fn new(redis_url: &str, key_prefix: impl Into<String>) -> FleetResult<Self> {
        info!("Creating Redis KV store with URL: {}", redis_url);

        let client = redis::Client::open(redis_url)
            .map_err(|e| FleetError::CacheError(e.to_string()))?;

        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| FleetError::CacheError(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| FleetError::CacheError(e.to_string()))?;

        info!("Redis KV store created successfully");

        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            delete_if_equals: redis::Script::new(DELETE_IF_EQUALS_SCRIPT),
        })
    }

    async fn get_connection(&self) -> FleetResult<redis::aio::ConnectionManager> {
        self.client
            .get_connection_manager()
            .await
            .map_err(|e| FleetError::CacheError(e.to_string()))
    }

    /// Build full key with prefix
    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> FleetResult<Option<String>> {
        let full_key = self.build_key(key);
        debug!("KV GET: {}", full_key);

        let mut conn = self.get_connection().await?;
        let result: Option<String> = redis::cmd("GET")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV GET failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> FleetResult<()> {
        let full_key = self.build_key(key);
        debug!("KV SET: {} (TTL: {:?})", full_key, ttl);

        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV SET failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> FleetResult<bool> {
        let full_key = self.build_key(key);
        debug!("KV SET NX: {} (TTL: {:?})", full_key, ttl);

        let mut conn = self.get_connection().await?;
        // SET ... NX PX returns OK when written, nil when the key already exists
        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV SET NX failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> FleetResult<bool> {
        let full_key = self.build_key(key);
        debug!("KV DEL: {}", full_key);

        let mut conn = self.get_connection().await?;
        let deleted: i64 = redis::cmd("DEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV DEL failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(deleted > 0)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> FleetResult<bool> {
        let full_key = self.build_key(key);
        debug!("KV compare-and-delete: {}", full_key);

        let mut conn = self.get_connection().await?;
        let deleted: i64 = self
            .delete_if_equals
            .key(&full_key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV compare-and-delete failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> FleetResult<bool> {
        let full_key = self.build_key(key);

        let mut conn = self.get_connection().await?;
        let found: i64 = redis::cmd("EXISTS")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV EXISTS failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        Ok(found > 0)
    }

    async fn ttl_remaining(&self, key: &str) -> FleetResult<Option<Duration>> {
        let full_key = self.build_key(key);

        let mut conn = self.get_connection().await?;
        // PTTL returns -2 when the key does not exist, -1 when it has no expiry
        let millis: i64 = redis::cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("KV PTTL failed for key {}: {}", full_key, e);
                FleetError::CacheError(e.to_string())
            })?;

        if millis < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(millis as u64)))
        }
    }
}
