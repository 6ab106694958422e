//! Identity provider client (spec.md §4.3: credential verification is
//! delegated to an external IdP, the backend never stores passwords).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::settings::IdpSettings;
use crate::errors::AppError;

#[async_trait]
pub trait IdpClient: Send + Sync {
    /// Verifies `internal_email`/`password` against the IdP. Returns `Ok(true)`
    /// on success, `Ok(false)` on a clean credential rejection, `Err` on a
    /// transport/provider failure.
    async fn verify_credentials(&self, internal_email: &str, password: &SecretString) -> Result<bool, AppError>;

    /// Registers a brand-new credential pair with the IdP during signup.
    async fn create_credentials(&self, internal_email: &str, password: &SecretString) -> Result<(), AppError>;
}

pub struct HttpIdpClient {
    http: reqwest::Client,
    base_url: String,
    service_client_id: String,
    service_client_secret: SecretString,
}

impl HttpIdpClient {
    pub fn new(settings: &IdpSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.clone(),
            service_client_id: settings.service_client_id.clone(),
            service_client_secret: settings.service_client_secret.clone(),
        }
    }
}

#[derive(serde::Serialize)]
struct VerifyRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(serde::Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[async_trait]
impl IdpClient for HttpIdpClient {
    #[tracing::instrument(skip(self, password))]
    async fn verify_credentials(&self, internal_email: &str, password: &SecretString) -> Result<bool, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/verify", self.base_url))
            .json(&VerifyRequest {
                client_id: &self.service_client_id,
                client_secret: self.service_client_secret.expose_secret(),
                username: internal_email,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| AppError::Transient(format!("idp request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(false);
        }
        let body: VerifyResponse = response
            .error_for_status()
            .map_err(|e| AppError::Transient(format!("idp returned an error: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Transient(format!("idp response was not valid json: {e}")))?;
        Ok(body.valid)
    }

    #[tracing::instrument(skip(self, password))]
    async fn create_credentials(&self, internal_email: &str, password: &SecretString) -> Result<(), AppError> {
        self.http
            .post(format!("{}/v1/credentials", self.base_url))
            .json(&VerifyRequest {
                client_id: &self.service_client_id,
                client_secret: self.service_client_secret.expose_secret(),
                username: internal_email,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| AppError::Transient(format!("idp request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Transient(format!("idp rejected credential creation: {e}")))?;
        Ok(())
    }
}

/// Deterministic in-memory double for tests — never calls out over the
/// network (Design Notes §9: "a second in-memory implementation serves
/// tests").
pub struct StubIdpClient {
    credentials: tokio::sync::RwLock<std::collections::HashMap<String, String>>,
}

impl StubIdpClient {
    pub fn new() -> Self {
        Self {
            credentials: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    pub async fn seed(&self, internal_email: &str, password: &str) {
        self.credentials
            .write()
            .await
            .insert(internal_email.to_string(), password.to_string());
    }
}

impl Default for StubIdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdpClient for StubIdpClient {
    async fn verify_credentials(&self, internal_email: &str, password: &SecretString) -> Result<bool, AppError> {
        let creds = self.credentials.read().await;
        Ok(creds.get(internal_email).map(|p| p.as_str()) == Some(password.expose_secret()))
    }

    async fn create_credentials(&self, internal_email: &str, password: &SecretString) -> Result<(), AppError> {
        self.credentials
            .write()
            .await
            .insert(internal_email.to_string(), password.expose_secret().to_string());
        Ok(())
    }
}
