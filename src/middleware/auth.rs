//! Bearer-token authentication extractor (spec.md §4.3, Design Notes §9:
//! "Request-scoped 'current user' global" is replaced by an explicit
//! extractor argument — no thread-local, no module-level state).

use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};

use crate::app_state::AppState;
use crate::errors::AppError;
use crate::models::auth::Claims;

/// The verified caller. Handlers that require authentication take this as
/// an argument; actix rejects the request before the handler body runs if
/// the bearer token is missing, malformed, or expired.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub Claims);

impl AuthedUser {
    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

fn extract(req: &HttpRequest) -> Result<AuthedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("app state missing".into()))?;
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;
    let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthenticated)?;
    let claims = state.identity.verify_access_token(token)?;
    Ok(AuthedUser(claims))
}
