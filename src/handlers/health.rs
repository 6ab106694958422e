//! `GET /health` (liveness) and `GET /health/full` (store + cache check).

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app_state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/health/full", web::get().to(health_full));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Exercises the store and the cache so a load balancer can distinguish
/// "process is up" from "process can actually serve traffic".
async fn health_full(state: web::Data<AppState>) -> HttpResponse {
    let schema_version = state.store.current_schema_version().await;
    let cache_enabled = state.cache.enabled();

    match schema_version {
        Ok(version) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "schema_version": version.to_string(),
            "cache_enabled": cache_enabled,
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(json!({
            "status": "degraded",
            "error": e.to_string(),
            "cache_enabled": cache_enabled,
        })),
    }
}
