//! Trace context middleware (spec.md §6, Design Notes §9): binds
//! `X-Session-ID`/`X-Request-ID` onto every request's extensions so
//! handlers, services, logs, and the ingestion job payload all carry the
//! same pair, instead of reaching for an ambient global.
//!
//! `session_id` persists per browser session (the caller re-sends it);
//! `request_id` is minted fresh per call whenever the caller doesn't supply
//! one. Both are echoed back on the response.

use std::future::{ready, Ready};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use rand::RngCore;

const REQUEST_ID_HEADER: &str = "X-Request-ID";
const SESSION_ID_HEADER: &str = "X-Session-ID";

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
pub struct SessionId(pub String);

fn random_hex8() -> String {
    let mut bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct TraceContext;

impl<S, B> Transform<S, ServiceRequest> for TraceContext
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TraceContextMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceContextMiddleware { service }))
    }
}

pub struct TraceContextMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceContextMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session_id = req
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("mt-sess-{}", random_hex8()));
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("mt-req-{}", random_hex8()));

        req.extensions_mut().insert(RequestId(request_id.clone()));
        req.extensions_mut().insert(SessionId(session_id.clone()));

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut().insert(HeaderName::from_static("x-request-id"), value);
            }
            if let Ok(value) = HeaderValue::from_str(&session_id) {
                res.headers_mut().insert(HeaderName::from_static("x-session-id"), value);
            }
            Ok(res)
        })
    }
}

/// Extractor giving handlers the (session_id, request_id) pair bound by
/// `TraceContext` without threading it through every function signature by
/// hand.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    pub session_id: String,
    pub request_id: String,
}

impl actix_web::FromRequest for RequestTrace {
    type Error = crate::errors::AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let ext = req.extensions();
        let request_id = ext.get::<RequestId>().map(|r| r.0.clone()).unwrap_or_else(|| "unknown".into());
        let session_id = ext.get::<SessionId>().map(|r| r.0.clone()).unwrap_or_else(|| "unknown".into());
        ready(Ok(RequestTrace { session_id, request_id }))
    }
}

impl From<RequestTrace> for crate::models::common::TraceContext {
    fn from(t: RequestTrace) -> Self {
        crate::models::common::TraceContext {
            session_id: t.session_id,
            request_id: t.request_id,
        }
    }
}
