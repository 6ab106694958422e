use std::env;
use std::collections::HashMap;

use config::{Config, ConfigError, File};
use dotenv::dotenv;
use secrecy::{ExposeSecret, SecretString};

use crate::config::jwt::JwtSettings;

#[derive(serde::Deserialize, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtConfig,
    pub idp: IdpSettings,
    pub rate_limit: RateLimitSettings,
    pub ingestion: IngestionSettings,
}

#[derive(serde::Deserialize, Debug)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(serde::Deserialize, Debug)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: SecretString,
    pub port: u16,
    pub host: String,
    pub db_name: String,
    #[serde(default)]
    pub db_url: Option<SecretString>,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> SecretString {
        match &self.db_url {
            Some(db_url) => db_url.clone(),
            None => SecretString::new(
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    self.user,
                    self.password.expose_secret(),
                    self.host,
                    self.port,
                    self.db_name
                )
                .into_boxed_str(),
            ),
        }
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port
        )
    }
}

/// Redis backs the cache layer, the job broker, and the result store in this
/// deployment.
#[derive(serde::Deserialize, Debug)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub redis_url: Option<SecretString>,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub default_cache_ttl_secs: u64,
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_result_ttl() -> u64 {
    24 * 60 * 60
}

impl RedisSettings {
    pub fn connection_string(&self) -> SecretString {
        match &self.redis_url {
            Some(url) => url.clone(),
            None => SecretString::new(format!("redis://{}:{}", self.host, self.port).into_boxed_str()),
        }
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Credentials and addressing for the external identity provider spoken to
/// over HTTP via `reqwest`, plus the internal-email mapping suffix used to
/// address a username-only account at the IdP
/// (`<username>@<internal-domain>`).
#[derive(serde::Deserialize, Debug)]
pub struct IdpSettings {
    pub base_url: String,
    pub service_client_id: String,
    pub service_client_secret: SecretString,
    pub internal_email_domain: String,
}

/// Per-route-class thresholds. Defaults are a configuration concern, tuned
/// per deployment rather than hard-coded.
#[derive(serde::Deserialize, Debug)]
pub struct RateLimitSettings {
    #[serde(default = "default_login_limit")]
    pub login_per_minute: u32,
    #[serde(default = "default_signup_limit")]
    pub signup_per_minute: u32,
    #[serde(default = "default_invite_validate_limit")]
    pub invite_validate_per_minute: u32,
    #[serde(default = "default_read_limit")]
    pub authenticated_read_per_minute: u32,
}

fn default_login_limit() -> u32 {
    10
}
fn default_signup_limit() -> u32 {
    10
}
fn default_invite_validate_limit() -> u32 {
    30
}
fn default_read_limit() -> u32 {
    600
}

/// Per-producer ingestion policy (Open Question 1: auto-create vs. fail).
#[derive(serde::Deserialize, Debug, Clone)]
pub struct IngestionSettings {
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default = "default_job_deadline_secs")]
    pub job_deadline_secs: u64,
    #[serde(default = "default_retry_cap")]
    pub retry_cap: u32,
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
    /// Producer identity -> auto-create-unknown-entities policy. Producers
    /// absent from this map default to `false` (fail closed with
    /// `UnknownEntity`).
    #[serde(default)]
    pub auto_create_by_producer: HashMap<String, bool>,
}

fn default_worker_concurrency() -> usize {
    4
}
fn default_job_deadline_secs() -> u64 {
    30
}
fn default_retry_cap() -> u32 {
    5
}
fn default_retry_base_secs() -> u64 {
    2
}

impl IngestionSettings {
    pub fn auto_create_for(&self, producer: &str) -> bool {
        self.auto_create_by_producer
            .get(producer)
            .copied()
            .unwrap_or(false)
    }
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)))
        .add_source(
            config::Environment::default()
                .prefix("POSTGRES")
                .prefix_separator("__")
                .separator("__"),
        )
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;

    // Platform-managed deploys expose connection strings directly as env vars.
    if let Ok(db_url) = env::var("DATABASE_URL") {
        settings.database.db_url = Some(SecretString::new(db_url.into_boxed_str()));
    }
    if let Ok(redis_url) = env::var("REDIS_URL") {
        settings.redis.redis_url = Some(SecretString::new(redis_url.into_boxed_str()));
    }
    if let Ok(jwt_secret) = env::var("JWT_SECRET") {
        settings.jwt.secret = SecretString::new(jwt_secret.into_boxed_str());
    }

    Ok(settings)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_jwt_settings(settings: &Settings) -> JwtSettings {
    JwtSettings::new(
        settings.jwt.secret.expose_secret().to_string(),
        settings.jwt.access_ttl_minutes,
        settings.jwt.refresh_ttl_days,
    )
}

pub fn get_redis_url(settings: &Settings) -> SecretString {
    settings.redis.connection_string()
}
