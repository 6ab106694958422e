// src/models/ingestion.rs
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::TraceContext;

/// External producers POST team *names*, not ids (spec.md §4.6).
#[derive(Debug, Validate, Deserialize, Serialize, Clone)]
pub struct MatchSubmission {
    #[validate(length(min = 1))]
    pub home_team: String,
    #[validate(length(min = 1))]
    pub away_team: String,
    #[validate(length(min = 1))]
    pub league: String,
    #[validate(length(min = 1))]
    pub season: String,
    #[validate(length(min = 1))]
    pub age_group: String,
    #[validate(length(min = 1))]
    pub division: String,
    #[validate(length(min = 1))]
    pub match_type: String,
    pub match_date: DateTime<Utc>,
    pub match_time: Option<NaiveTime>,
    pub location: Option<String>,
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(range(min = 0))]
    pub home_score: Option<i32>,
    #[validate(range(min = 0))]
    pub away_score: Option<i32>,
    pub external_match_id: String,
}

/// Message shape enqueued onto the broker (Design Notes §9: "plain
/// messages", trace context flows on the payload, not ambient globals).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestionJob {
    pub task_id: Uuid,
    pub submission: MatchSubmission,
    pub producer: String,
    pub trace: TraceContext,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestAction {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestResult {
    pub match_id: Uuid,
    pub action: IngestAction,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskRecord {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IngestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            result: None,
            error: None,
        }
    }

    pub fn started() -> Self {
        Self {
            state: TaskState::Started,
            result: None,
            error: None,
        }
    }

    pub fn success(result: IngestResult) -> Self {
        Self {
            state: TaskState::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>) -> Self {
        Self {
            state: TaskState::Failure,
            result: None,
            error: Some(code.into()),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct SubmitResponse {
    pub task_id: Uuid,
    pub status_url: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct TaskStatusResponse {
    pub state: TaskState,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IngestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(r: TaskRecord) -> Self {
        let ready = matches!(r.state, TaskState::Success | TaskState::Failure);
        Self {
            state: r.state,
            ready,
            result: r.result,
            error: r.error,
        }
    }
}
