use crate::error::WrappedResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Key/value persistence port behind the event store
#[async_trait]
pub trait StateStorage: Send + Sync + 'static {
    /// Read a value, `None` when the key is absent
    async fn load(&self, key: &str) -> WrappedResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn save(&self, key: &str, value: &str) -> WrappedResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn clear(&self, key: &str) -> WrappedResult<()>;
}

/// How long stored values live without being written again: 7 days, the
/// lifetime of the auth cookie
pub const STATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Process-memory implementation, used when Redis is not configured.
///
/// Entries expire after the TTL like their Redis counterparts. Expired
/// entries read as absent and are pruned on the next write.
#[derive(Debug)]
pub struct InMemoryStorage {
    values: RwLock<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::with_ttl(STATE_TTL)
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.values
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StateStorage for InMemoryStorage {
    async fn load(&self, key: &str) -> WrappedResult<Option<String>> {
        let values = self.values.read().await;
        let now = Instant::now();
        Ok(values
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn save(&self, key: &str, value: &str) -> WrappedResult<()> {
        let mut values = self.values.write().await;
        let now = Instant::now();
        values.retain(|_, (_, expires_at)| *expires_at > now);
        values.insert(key.to_string(), (value.to_string(), now + self.ttl));
        Ok(())
    }

    async fn clear(&self, key: &str) -> WrappedResult<()> {
        let mut values = self.values.write().await;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.load("k").await.unwrap(), None);

        storage.save("k", "v1").await.unwrap();
        storage.save("k", "v2").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), Some("v2".to_string()));
        assert_eq!(storage.len().await, 1);

        storage.clear("k").await.unwrap();
        storage.clear("missing").await.unwrap();
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_in_memory_entries_expire() {
        let storage = InMemoryStorage::with_ttl(Duration::ZERO);
        storage.save("k", "v").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), None);
        assert!(storage.is_empty().await);

        // Expired entries are dropped on the next write
        storage.save("other", "v").await.unwrap();
        assert_eq!(storage.values.read().await.len(), 1);

        let storage = InMemoryStorage::new();
        assert_eq!(storage.ttl, STATE_TTL);
        storage.save("k", "v").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), Some("v".to_string()));
    }
}
