use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{http, web, App, HttpServer};
use tracing_actix_web::TracingLogger;

pub mod app_state;
pub mod authz;
pub mod cache;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod ingestion;
pub mod invites;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routes;
pub mod store;
pub mod telemetry;

use crate::app_state::AppState;
use crate::routes::init_routes;

/// Wires the actix `App`: CORS, `TracingLogger`, then this crate's own
/// `TraceContext` middleware, then route configuration. `AuthedUser` is a
/// `FromRequest` extractor rather than a scoped `wrap`, so there is no
/// separate "protected scope" middleware layer here — which routes need
/// auth is decided per-handler.
pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::trace_context::TraceContext)
            .wrap(cors)
            .app_data(state.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Assembles an `AppState` from configuration — shared by `main.rs` and the
/// worker binary, which both need a `StoreGateway` and `CacheLayer` even
/// though the worker never touches the HTTP layer.
pub async fn build_state(settings: config::settings::Settings) -> Result<AppState, std::io::Error> {
    use secrecy::ExposeSecret;
    use sqlx::postgres::PgPoolOptions;

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(settings.database.connection_string().expose_secret())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let store: Arc<dyn store::StoreGateway> = Arc::new(store::pg::PgStoreGateway::new(db_pool));

    let cache_config = cache::CacheConfig {
        enabled: settings.redis.cache_enabled,
        default_ttl: Duration::from_secs(settings.redis.default_cache_ttl_secs),
    };
    let cache = cache::CacheLayer::new(&config::settings::get_redis_url(&settings), cache_config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let idp: Arc<dyn identity::idp_client::IdpClient> = Arc::new(identity::idp_client::HttpIdpClient::new(&settings.idp));
    let jwt = config::settings::get_jwt_settings(&settings);
    let identity = Arc::new(identity::IdentityService::new(
        store.clone(),
        idp,
        jwt,
        cache.clone(),
        settings.idp.internal_email_domain.clone(),
        settings.rate_limit.login_per_minute,
    ));

    let invites = Arc::new(invites::InviteService::new(store.clone()));

    let broker: Arc<dyn ingestion::broker::JobBroker> = Arc::new(ingestion::broker::RedisJobBroker::new(cache.clone()));
    let results: Arc<dyn ingestion::result_store::ResultStore> = Arc::new(ingestion::result_store::RedisResultStore::new(cache.clone()));
    let result_ttl = Duration::from_secs(settings.redis.result_ttl_secs);
    let ingestion = Arc::new(ingestion::api::IngestionApi::new(broker, results, result_ttl));

    let query = Arc::new(query::QueryService::new(store.clone(), cache.clone()));
    let rate_limiter = cache::rate_limiter::RateLimiter::new(cache.clone());

    Ok(AppState {
        store,
        cache,
        identity,
        invites,
        ingestion,
        query,
        rate_limiter,
        settings: Arc::new(settings),
    })
}
