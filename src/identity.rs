//! Authentication core: credential verification delegates to an external
//! IdP, the backend mints its own JWTs and opaque refresh tokens, and
//! tracks refresh-token families to detect replay.

pub mod idp_client;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::rate_limiter::{RateLimit, RateLimiter};
use crate::cache::CacheLayer;
use crate::config::jwt::JwtSettings;
use crate::errors::AppError;
use crate::identity::idp_client::IdpClient;
use crate::models::auth::{Claims, LoginResponse};
use crate::models::user::UserProfile;
use crate::store::StoreGateway;

const REFRESH_TOKEN_BYTES: usize = 32;

/// The value stored under a session family's cache key: the currently valid
/// refresh token plus its owner, so a presented token can be checked for
/// staleness without trusting anything the client sends beyond the token
/// itself.
#[derive(Serialize, Deserialize)]
struct FamilyRecord {
    token: String,
    user_id: Uuid,
}

pub struct IdentityService {
    store: Arc<dyn StoreGateway>,
    idp: Arc<dyn IdpClient>,
    jwt: JwtSettings,
    cache: CacheLayer,
    rate_limiter: RateLimiter,
    login_rate_limit: RateLimit,
    internal_email_domain: String,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        idp: Arc<dyn IdpClient>,
        jwt: JwtSettings,
        cache: CacheLayer,
        internal_email_domain: impl Into<String>,
        login_per_minute: u32,
    ) -> Self {
        let rate_limiter = RateLimiter::new(cache.clone());
        Self {
            store,
            idp,
            jwt,
            cache,
            rate_limiter,
            login_rate_limit: RateLimit::per_minute(login_per_minute),
            internal_email_domain: internal_email_domain.into(),
        }
    }

    fn internal_email(&self, username: &str) -> String {
        format!("{username}@{}", self.internal_email_domain)
    }

    fn mint_access_token(
        &self,
        profile: &UserProfile,
        session_id: &str,
        request_id: &str,
        session_family_id: Uuid,
    ) -> Result<String, AppError> {
        let exp = (Utc::now() + chrono::Duration::minutes(self.jwt.access_ttl_minutes)).timestamp() as usize;
        let claims = Claims {
            sub: profile.id,
            username: profile.username.clone(),
            role: profile.role,
            exp,
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            session_family_id,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("failed to mint access token: {e}")))
    }

    fn random_token_suffix(&self) -> String {
        use base64::Engine;
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    fn new_refresh_token(&self, family_id: Uuid) -> String {
        format!("{family_id}.{}", self.random_token_suffix())
    }

    fn family_key(family_id: Uuid) -> String {
        format!("mt:session_family:{family_id}")
    }

    async fn store_family_record(&self, family_id: Uuid, token: &str, user_id: Uuid) -> Result<(), AppError> {
        let ttl = Duration::from_secs((self.jwt.refresh_ttl_days.max(0) as u64) * 86_400);
        let record = FamilyRecord {
            token: token.to_string(),
            user_id,
        };
        let serialized = serde_json::to_string(&record)
            .map_err(|e| AppError::Internal(format!("failed to serialize session record: {e}")))?;
        self.cache.put_raw(&Self::family_key(family_id), &serialized, ttl).await
    }

    async fn load_family_record(&self, family_id: Uuid) -> Result<Option<FamilyRecord>, AppError> {
        let Some(raw) = self.cache.get_raw(&Self::family_key(family_id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("corrupt session record: {e}")))?;
        Ok(Some(record))
    }

    /// Verifies username/password against the IdP (mapped through the
    /// internal-email suffix), rate-limited per (ip, username), and mints a
    /// fresh access/refresh token pair on success.
    #[tracing::instrument(skip(self, password), fields(username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        client_ip: &str,
        session_id: &str,
        request_id: &str,
    ) -> Result<LoginResponse, AppError> {
        self.rate_limiter
            .check(&format!("login:{client_ip}:{username}"), self.login_rate_limit)
            .await?;

        let profile = self
            .store
            .find_profile_by_username(username)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let internal_email = self.internal_email(username);
        let valid = self.idp.verify_credentials(&internal_email, password).await?;
        if !valid {
            return Err(AppError::invalid_credentials());
        }

        self.store.touch_last_login(profile.id, Utc::now()).await?;

        let family_id = Uuid::new_v4();
        let refresh_token = self.new_refresh_token(family_id);
        self.store_family_record(family_id, &refresh_token, profile.id).await?;
        let access_token = self.mint_access_token(&profile, session_id, request_id, family_id)?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            profile,
        })
    }

    /// Rotates a refresh token. Presenting a token that has already been
    /// rotated out (but whose family still exists) is treated as replay and
    /// revokes the entire family.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        session_id: &str,
        request_id: &str,
    ) -> Result<LoginResponse, AppError> {
        let family_id = Self::family_id_from_token(refresh_token)?;
        let Some(record) = self.load_family_record(family_id).await? else {
            return Err(AppError::Unauthenticated);
        };
        if record.token != refresh_token {
            self.cache.delete_raw(&Self::family_key(family_id)).await?;
            tracing::warn!(%family_id, "refresh token reuse detected; family revoked");
            return Err(AppError::Unauthenticated);
        }

        let profile = self.store.get_profile(record.user_id).await?;

        let new_token = self.new_refresh_token(family_id);
        self.store_family_record(family_id, &new_token, profile.id).await?;
        let access_token = self.mint_access_token(&profile, session_id, request_id, family_id)?;

        Ok(LoginResponse {
            access_token,
            refresh_token: new_token,
            profile,
        })
    }

    fn family_id_from_token(token: &str) -> Result<Uuid, AppError> {
        let (family_str, _) = token.split_once('.').ok_or(AppError::Unauthenticated)?;
        Uuid::parse_str(family_str).map_err(|_| AppError::Unauthenticated)
    }

    pub async fn logout(&self, session_family_id: Uuid) -> Result<(), AppError> {
        self.cache.delete_raw(&Self::family_key(session_family_id)).await
    }

    /// Registers the new user's credentials with the IdP and mints the
    /// first session for a just-created profile — used by the signup flow
    /// after an invite is consumed.
    #[tracing::instrument(skip(self, password, profile))]
    pub async fn register_and_issue_session(
        &self,
        profile: &UserProfile,
        password: &SecretString,
        session_id: &str,
        request_id: &str,
    ) -> Result<LoginResponse, AppError> {
        let internal_email = self.internal_email(&profile.username);
        self.idp.create_credentials(&internal_email, password).await?;

        let family_id = Uuid::new_v4();
        let refresh_token = self.new_refresh_token(family_id);
        self.store_family_record(family_id, &refresh_token, profile.id).await?;
        let access_token = self.mint_access_token(profile, session_id, request_id, family_id)?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            profile: profile.clone(),
        })
    }

    /// Decodes and validates a bearer access token.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 5;
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Expired,
            _ => AppError::Unauthenticated,
        })?;
        Ok(data.claims)
    }
}
