//! Top-level route wiring — each handler module owns its own `web::scope`
//! and is configured in turn. Authentication is enforced per-handler via
//! the `AuthedUser`
//! extractor rather than a scope-level `wrap`, since which routes are
//! public vs. authenticated varies field-by-field within a single scope
//! (e.g. `GET /api/invites/validate/{code}` is public, `POST
//! /api/invites/{issuer}/{target}` is not).

use actix_web::web;

use crate::handlers;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::health::configure)
        .configure(handlers::auth::configure)
        .configure(handlers::invites::configure)
        .configure(handlers::clubs::configure)
        .configure(handlers::teams::configure)
        .configure(handlers::matches::configure)
        .configure(handlers::table::configure);
}
