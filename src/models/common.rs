// src/models/common.rs
use serde::{Deserialize, Serialize};

/// Generic success envelope used by list/detail endpoints. Error responses
/// use the distinct `{error: {...}}` envelope in `crate::errors`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    25
}

impl PaginationQuery {
    pub fn offset(&self) -> i64 {
        ((self.page.max(1) - 1) * self.per_page.clamp(1, 200)) as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 200) as i64
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PaginationInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl PaginationInfo {
    pub fn new(query: &PaginationQuery, total: i64) -> Self {
        let per_page = query.per_page.clamp(1, 200);
        let total_pages = if total == 0 {
            0
        } else {
            ((total as u32) + per_page - 1) / per_page
        };
        Self {
            page: query.page.max(1),
            per_page,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

/// The (session_id, request_id) pair propagated through logs, handlers,
/// services, and the ingestion job payload (spec.md §6, Design Notes §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub session_id: String,
    pub request_id: String,
}
