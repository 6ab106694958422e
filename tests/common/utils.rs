//! Test harness shared across the integration tests (Design Notes §9
//! "capability-interface DAO"): the app under test runs against the
//! in-memory store, job broker, and result store, and a disabled cache, so
//! these tests never need a live Postgres or Redis instance.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{json, Value};
use uuid::Uuid;

use mintturf_backend::app_state::AppState;
use mintturf_backend::cache::rate_limiter::RateLimiter;
use mintturf_backend::cache::CacheLayer;
use mintturf_backend::config::jwt::JwtSettings;
use mintturf_backend::config::settings::{
    ApplicationSettings, DatabaseSettings, IdpSettings, IngestionSettings, JwtConfig,
    RateLimitSettings, RedisSettings, Settings,
};
use mintturf_backend::identity::idp_client::{IdpClient, StubIdpClient};
use mintturf_backend::identity::IdentityService;
use mintturf_backend::ingestion::api::IngestionApi;
use mintturf_backend::ingestion::broker::{InMemoryJobBroker, JobBroker};
use mintturf_backend::ingestion::result_store::{InMemoryResultStore, ResultStore};
use mintturf_backend::invites::InviteService;
use mintturf_backend::models::user::{Role, UserProfile};
use mintturf_backend::query::QueryService;
use mintturf_backend::run;
use mintturf_backend::store::memory::InMemoryStoreGateway;
use mintturf_backend::store::StoreGateway;
use mintturf_backend::telemetry::{get_subscriber, init_subscriber};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const INTERNAL_EMAIL_DOMAIN: &str = "users.test.internal";

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_string().into_boxed_str())
}

/// A `Settings` value good enough to satisfy handlers that read it (rate
/// limits, ingestion policy) without ever touching Postgres or Redis — the
/// pool and cache this harness builds come straight from the in-memory
/// doubles below, not from `database`/`redis` here.
fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            user: "test".to_string(),
            password: secret("test"),
            port: 5432,
            host: "127.0.0.1".to_string(),
            db_name: "test".to_string(),
            db_url: None,
        },
        redis: RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 6379,
            redis_url: None,
            cache_enabled: false,
            default_cache_ttl_secs: 60,
            result_ttl_secs: 86_400,
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "info".to_string(),
        },
        jwt: JwtConfig {
            secret: secret("test-secret-do-not-use-in-prod"),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        },
        idp: IdpSettings {
            base_url: "http://unused.invalid".to_string(),
            service_client_id: "test".to_string(),
            service_client_secret: secret("test"),
            internal_email_domain: INTERNAL_EMAIL_DOMAIN.to_string(),
        },
        rate_limit: RateLimitSettings {
            login_per_minute: 1000,
            signup_per_minute: 1000,
            invite_validate_per_minute: 1000,
            authenticated_read_per_minute: 1000,
        },
        ingestion: IngestionSettings {
            worker_concurrency: 1,
            job_deadline_secs: 30,
            retry_cap: 3,
            retry_base_secs: 1,
            auto_create_by_producer: HashMap::new(),
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStoreGateway>,
    pub idp: Arc<StubIdpClient>,
    pub client: Client,
    pub broker: Arc<dyn JobBroker>,
    pub results: Arc<dyn ResultStore>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Seeds a profile directly into the store and registers its password
    /// with the stub IdP, bypassing the invite flow, for tests that only
    /// care about what happens after login.
    pub async fn seed_user(&self, username: &str, role: Role, password: &str) -> UserProfile {
        let now = chrono::Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            phone_number: None,
            role,
            team_id: None,
            club_id: None,
            display_name: None,
            player_number: None,
            positions: Vec::new(),
            assigned_age_group_id: None,
            invited_via_code: None,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        let profile = self
            .store
            .create_profile(profile)
            .await
            .expect("failed to seed test profile");
        self.idp
            .seed(&format!("{username}@{INTERNAL_EMAIL_DOMAIN}"), password)
            .await;
        profile
    }

    pub async fn login(&self, username: &str, password: &str) -> (String, Value) {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        assert!(response.status().is_success(), "login did not succeed: {}", response.status());
        let body: Value = response.json().await.expect("login response was not json");
        let token = body["access_token"]
            .as_str()
            .expect("no access_token in login response")
            .to_string();
        (token, body)
    }

    /// Builds an `IngestionWorker` sharing this app's store, broker, and
    /// result store, so a test can process a submitted job deterministically
    /// instead of racing a background worker task.
    pub fn ingestion_worker(&self, auto_create_by_producer: HashMap<String, bool>) -> mintturf_backend::ingestion::worker::IngestionWorker {
        mintturf_backend::ingestion::worker::IngestionWorker::new(
            self.store.clone(),
            self.broker.clone(),
            self.results.clone(),
            CacheLayer::disabled(),
            IngestionSettings {
                worker_concurrency: 1,
                job_deadline_secs: 30,
                retry_cap: 3,
                retry_base_secs: 1,
                auto_create_by_producer,
            },
            Duration::from_secs(86_400),
        )
    }
}

/// Spins up the actix server against in-memory doubles on an OS-assigned
/// port, without a database.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{port}");

    let memory_store = Arc::new(InMemoryStoreGateway::new());
    let store: Arc<dyn StoreGateway> = memory_store.clone();
    let cache = CacheLayer::disabled();

    let idp = Arc::new(StubIdpClient::new());
    let jwt = JwtSettings::new("test-secret-do-not-use-in-prod".to_string(), 15, 7);
    let identity = Arc::new(IdentityService::new(
        store.clone(),
        idp.clone() as Arc<dyn IdpClient>,
        jwt,
        cache.clone(),
        INTERNAL_EMAIL_DOMAIN,
        1000,
    ));

    let invites = Arc::new(InviteService::new(store.clone()));

    let broker: Arc<dyn JobBroker> = Arc::new(InMemoryJobBroker::new());
    let results: Arc<dyn ResultStore> = Arc::new(InMemoryResultStore::new());
    let ingestion = Arc::new(IngestionApi::new(broker.clone(), results.clone(), Duration::from_secs(86_400)));

    let query = Arc::new(QueryService::new(store.clone(), cache.clone()));
    let rate_limiter = RateLimiter::new(cache.clone());

    let state = AppState {
        store,
        cache,
        identity,
        invites,
        ingestion,
        query,
        rate_limiter,
        settings: Arc::new(test_settings()),
    };

    let server = run(listener, state).expect("failed to bind test server");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store: memory_store,
        idp,
        client: Client::new(),
        broker,
        results,
    }
}
