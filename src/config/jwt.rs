use secrecy::SecretString;

/// Access tokens are recommended short-lived; refresh tokens longer-lived.
/// Rotation on every refresh defeats replay.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: SecretString,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"REDACTED")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

impl JwtSettings {
    pub fn new(secret: String, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            secret: SecretString::new(secret.into_boxed_str()),
            access_ttl_minutes,
            refresh_ttl_days,
        }
    }
}
