//! Crate-wide error taxonomy mapped to the HTTP error envelope.

use actix_web::{http::StatusCode, HttpRequest, HttpResponse, HttpMessage, ResponseError};
use serde::Serialize;
use serde_json::json;

use crate::middleware::trace_context::RequestId;

/// Every failure kind a handler can surface. A handful of kinds share an
/// HTTP status but carry their own stable `code` string (e.g.
/// `INVALID_CREDENTIALS`, `UNKNOWN_ENTITY`) rather than the generic
/// category code — `code()` below special-cases those.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("access token expired")]
    Expired,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invite is no longer available")]
    Gone(&'static str),

    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("{0}")]
    InvariantViolation(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("internal error")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl AppError {
    /// The stable `code` string carried in every error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::UnknownEntity(_) => "UNKNOWN_ENTITY",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Expired => "TOKEN_EXPIRED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Gone(code) => code,
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::Transient(_) => "TRANSIENT",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn invalid_credentials() -> Self {
        // Never reveals whether the username or the password was wrong.
        AppError::InvalidCredentials
    }

    pub fn invite_expired() -> Self {
        AppError::Gone("INVITE_EXPIRED")
    }

    pub fn invite_exhausted() -> Self {
        AppError::Gone("INVITE_EXHAUSTED")
    }

    pub fn unknown_entity(what: impl Into<String>) -> Self {
        AppError::UnknownEntity(what.into())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    request_id: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownEntity(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Expired => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(err) = self {
            tracing::error!(%err, "internal error");
        }
        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::RateLimited { retry_after_secs } = self {
            builder.insert_header(("Retry-After", retry_after_secs.to_string()));
        }
        builder.json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "request_id": "unknown",
            }
        }))
    }
}

/// Renders the error envelope with the request's trace id attached.
/// Handlers that have access to the `HttpRequest` should prefer this over
/// the bare `ResponseError` impl so `request_id` round-trips correctly.
pub fn respond(req: &HttpRequest, err: AppError) -> HttpResponse {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());
    if let AppError::Internal(ref e) = err {
        tracing::error!(%e, request_id, "internal error");
    }
    let mut builder = HttpResponse::build(err.status_code());
    if let AppError::RateLimited { retry_after_secs } = err {
        builder.insert_header(("Retry-After", retry_after_secs.to_string()));
    }
    builder.json(ErrorBody {
        error: ErrorDetail {
            code: err.code(),
            message: err.to_string(),
            details: None,
            request_id,
        },
    })
}

impl From<crate::store::StoreError> for AppError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::NotFound(what) => AppError::NotFound(what),
            crate::store::StoreError::Conflict(msg) => AppError::Conflict(msg),
            crate::store::StoreError::InvariantViolation(msg) => AppError::InvariantViolation(msg),
            crate::store::StoreError::Transient(msg) => AppError::Transient(msg),
        }
    }
}
