//! Shared application state, threaded through every handler via
//! `web::Data<AppState>` (Design Notes §9: explicit context, never a
//! request-scoped global).

use std::sync::Arc;

use crate::cache::rate_limiter::RateLimiter;
use crate::cache::CacheLayer;
use crate::config::settings::Settings;
use crate::identity::IdentityService;
use crate::ingestion::api::IngestionApi;
use crate::invites::InviteService;
use crate::query::QueryService;
use crate::store::StoreGateway;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreGateway>,
    pub cache: CacheLayer,
    pub identity: Arc<IdentityService>,
    pub invites: Arc<InviteService>,
    pub ingestion: Arc<IngestionApi>,
    pub query: Arc<QueryService>,
    pub rate_limiter: RateLimiter,
    pub settings: Arc<Settings>,
}
