//! Ingestion HTTP surface: accepts a `MatchSubmission`, hands it to the
//! broker, and returns a task id for polling.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::ingestion::broker::JobBroker;
use crate::ingestion::result_store::ResultStore;
use crate::models::common::TraceContext;
use crate::models::ingestion::{IngestionJob, MatchSubmission, SubmitResponse, TaskRecord, TaskStatusResponse};

pub struct IngestionApi {
    broker: Arc<dyn JobBroker>,
    results: Arc<dyn ResultStore>,
    result_ttl: Duration,
}

impl IngestionApi {
    pub fn new(broker: Arc<dyn JobBroker>, results: Arc<dyn ResultStore>, result_ttl: Duration) -> Self {
        Self {
            broker,
            results,
            result_ttl,
        }
    }

    #[tracing::instrument(skip(self, submission), fields(producer = %producer, task_id))]
    pub async fn submit(
        &self,
        submission: MatchSubmission,
        producer: String,
        trace: TraceContext,
    ) -> Result<SubmitResponse, AppError> {
        submission
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let task_id = Uuid::new_v4();
        tracing::Span::current().record("task_id", tracing::field::display(task_id));

        let job = IngestionJob {
            task_id,
            submission,
            producer,
            trace,
        };

        self.results.put(task_id, TaskRecord::pending(), self.result_ttl).await?;
        self.broker.enqueue(&job).await?;

        Ok(SubmitResponse {
            task_id,
            status_url: format!("/api/matches/task/{task_id}"),
        })
    }

    pub async fn status(&self, task_id: Uuid) -> Result<TaskStatusResponse, AppError> {
        let record = self
            .results
            .get(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("task".into()))?;
        Ok(record.into())
    }

    /// Exposes the shared broker/result-store handles so the standalone
    /// worker binary can build an `IngestionWorker` against the same queue.
    pub fn broker(&self) -> Arc<dyn JobBroker> {
        self.broker.clone()
    }

    pub fn results(&self) -> Arc<dyn ResultStore> {
        self.results.clone()
    }
}
