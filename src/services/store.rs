use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::JobRecord;

/// Persistent key-value mapping from job id to job record.
///
/// The store is the sole source of truth for job status. Atomic key-level
/// get/set is all the interface offers; each job's state lives under a single
/// key, so no multi-key transactions are needed. Records are never deleted by
/// this subsystem (expiry is a store-configuration concern).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, id: Uuid, record: &JobRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// Backend connectivity check (for /health).
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Redis-backed job store. One key per job id, value is the JSON record.
pub struct RedisJobStore {
    client: redis::Client,
}

impl RedisJobStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::Redis)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn put(&self, id: Uuid, record: &JobRecord) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Redis)?;
        let payload = serde_json::to_string(record).map_err(StoreError::Serialize)?;
        conn.set::<_, _, ()>(id.to_string(), payload)
            .await
            .map_err(StoreError::Redis)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Redis)?;
        let payload: Option<String> = conn
            .get(id.to_string())
            .await
            .map_err(StoreError::Redis)?;

        match payload {
            Some(payload) => {
                let record: JobRecord =
                    serde_json::from_str(&payload).map_err(StoreError::Serialize)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok(())
    }
}

/// In-memory job store for Redis-less single-process deployments and tests.
#[derive(Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<Uuid, JobRecord>>,
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, id: Uuid, record: &JobRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryJobStore::default();
        let id = Uuid::new_v4();

        assert_eq!(store.get(id).await.unwrap(), None);

        store.put(id, &JobRecord::queued()).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(JobRecord::queued()));

        let completed = JobRecord::completed(serde_json::json!(["https://x/out.png"]));
        store.put(id, &completed).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(completed));
    }

    #[tokio::test]
    async fn memory_store_keys_are_independent() {
        let store = MemoryJobStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.put(a, &JobRecord::queued()).await.unwrap();
        store.put(b, &JobRecord::failed()).await.unwrap();

        assert_eq!(store.get(a).await.unwrap(), Some(JobRecord::queued()));
        assert_eq!(store.get(b).await.unwrap(), Some(JobRecord::failed()));
    }
}
