pub mod auth;
pub mod clubs;
pub mod health;
pub mod invites;
pub mod matches;
pub mod table;
pub mod teams;

use actix_web::HttpRequest;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::cache::rate_limiter::RateLimit;
use crate::errors::AppError;
use crate::models::auth::Claims;

/// Best-effort client IP for rate-limiting scope keys. Prefers
/// `X-Forwarded-For` (set by the load balancer in front of this service)
/// and falls back to the socket peer address.
pub(crate) fn client_ip(req: &actix_web::HttpRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| req.peer_addr().map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gates a read-heavy query-service endpoint (spec.md §4.9: "lax on
/// authenticated reads" — lax still means bounded, keyed per-IP same as
/// the other route-class limits rather than per-process).
pub(crate) async fn check_read_rate_limit(state: &AppState, req: &HttpRequest) -> Result<(), AppError> {
    let ip = client_ip(req);
    state
        .rate_limiter
        .check(
            &format!("read:{ip}"),
            RateLimit::per_minute(state.settings.rate_limit.authenticated_read_per_minute),
        )
        .await
}

/// The (managed_team_ids, managed_club_id) pair `AuthorizationEngine::authorize`
/// takes as its last two arguments, resolved once per request here rather
/// than inside the engine itself.
pub(crate) async fn managed_scope(state: &AppState, claims: &Claims) -> Result<(Vec<Uuid>, Option<Uuid>), AppError> {
    let assignments = state.store.manager_assignments_for_user(claims.sub).await?;
    let team_ids = assignments.into_iter().map(|a| a.team_id).collect();
    let club_id = state.store.get_profile(claims.sub).await?.club_id;
    Ok((team_ids, club_id))
}
