//! Result store: `TaskRecord` keyed by `task_id`, TTL'd so clients can poll
//! `GET /api/matches/task/{id}` without the backend accumulating state
//! forever.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cache::CacheLayer;
use crate::errors::AppError;
use crate::models::ingestion::TaskRecord;

fn task_key(task_id: Uuid) -> String {
    format!("mt:task:{task_id}")
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn put(&self, task_id: Uuid, record: TaskRecord, ttl: Duration) -> Result<(), AppError>;
    async fn get(&self, task_id: Uuid) -> Result<Option<TaskRecord>, AppError>;
}

pub struct RedisResultStore {
    cache: CacheLayer,
}

impl RedisResultStore {
    pub fn new(cache: CacheLayer) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn put(&self, task_id: Uuid, record: TaskRecord, ttl: Duration) -> Result<(), AppError> {
        let serialized = serde_json::to_string(&record)
            .map_err(|e| AppError::Internal(format!("failed to serialize task record: {e}")))?;
        self.cache.put_raw(&task_key(task_id), &serialized, ttl).await
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<TaskRecord>, AppError> {
        let Some(raw) = self.cache.get_raw(&task_key(task_id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("corrupt task record: {e}")))?;
        Ok(Some(record))
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    records: RwLock<HashMap<Uuid, TaskRecord>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put(&self, task_id: Uuid, record: TaskRecord, _ttl: Duration) -> Result<(), AppError> {
        self.records.write().await.insert(task_id, record);
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<TaskRecord>, AppError> {
        Ok(self.records.read().await.get(&task_id).cloned())
    }
}
