use super::storage::{StateStorage, STATE_TTL};
use crate::error::{storage_error, WrappedResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::info;

mod keys {
    pub const PING: &str = "wrapped:ping";
    pub const EXPIRY_SECONDS: i64 = super::STATE_TTL.as_secs() as i64;
}

/// Redis-backed state storage
pub struct RedisStorage {
    client: RedisClient,
}

impl RedisStorage {
    /// Create a client for `redis_url`. No connection is made yet.
    pub fn new(redis_url: &str) -> WrappedResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> WrappedResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))
    }

    /// Check that the server answers
    pub async fn ping(&self) -> WrappedResult<()> {
        let mut conn = self.get_connection().await?;
        let _: bool = conn
            .exists(keys::PING)
            .await
            .map_err(|e| storage_error(&format!("Redis EXISTS error: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl StateStorage for RedisStorage {
    async fn load(&self, key: &str) -> WrappedResult<Option<String>> {
        let mut conn = self.get_connection().await?;

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| storage_error(&format!("Redis GET error: {}", e)))?;

        Ok(value)
    }

    async fn save(&self, key: &str, value: &str) -> WrappedResult<()> {
        let mut conn = self.get_connection().await?;

        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| storage_error(&format!("Redis SET error: {}", e)))?;

        conn.expire::<_, ()>(key, keys::EXPIRY_SECONDS)
            .await
            .map_err(|e| storage_error(&format!("Redis EXPIRE error: {}", e)))?;

        Ok(())
    }

    async fn clear(&self, key: &str) -> WrappedResult<()> {
        let mut conn = self.get_connection().await?;

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| storage_error(&format!("Redis DEL error: {}", e)))?;

        Ok(())
    }
}
