//! Job broker: plain messages on a list, rather than a bespoke task-queue
//! protocol.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use std::collections::VecDeque;

use crate::cache::CacheLayer;
use crate::errors::AppError;
use crate::models::ingestion::IngestionJob;

const QUEUE_KEY: &str = "mt:queue:ingestion";

#[async_trait]
pub trait JobBroker: Send + Sync {
    async fn enqueue(&self, job: &IngestionJob) -> Result<(), AppError>;
    /// Blocks up to `timeout` waiting for a job; `None` means the timeout
    /// elapsed with nothing queued.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<IngestionJob>, AppError>;
}

pub struct RedisJobBroker {
    cache: CacheLayer,
}

impl RedisJobBroker {
    pub fn new(cache: CacheLayer) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl JobBroker for RedisJobBroker {
    async fn enqueue(&self, job: &IngestionJob) -> Result<(), AppError> {
        let serialized = serde_json::to_string(job)
            .map_err(|e| AppError::Internal(format!("failed to serialize ingestion job: {e}")))?;
        self.cache.list_push(QUEUE_KEY, &serialized).await
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<IngestionJob>, AppError> {
        let Some(raw) = self.cache.list_blocking_pop(QUEUE_KEY, timeout).await? else {
            return Ok(None);
        };
        let job = serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("corrupt ingestion job on the queue: {e}")))?;
        Ok(Some(job))
    }
}

/// In-memory fake used by tests and by the lighter non-Postgres integration
/// style.
#[derive(Default)]
pub struct InMemoryJobBroker {
    queue: Mutex<VecDeque<IngestionJob>>,
}

impl InMemoryJobBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobBroker for InMemoryJobBroker {
    async fn enqueue(&self, job: &IngestionJob) -> Result<(), AppError> {
        self.queue.lock().await.push_back(job.clone());
        Ok(())
    }

    async fn dequeue(&self, _timeout: Duration) -> Result<Option<IngestionJob>, AppError> {
        Ok(self.queue.lock().await.pop_front())
    }
}
