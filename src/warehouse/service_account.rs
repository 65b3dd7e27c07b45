use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::WarehouseError, management::ServiceAccountKey, warning};

const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Access tokens for the warehouse API, minted from a service-account key.
///
/// A signed assertion is exchanged at the key's `token_uri`; the resulting
/// token is cached until shortly before it expires.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    key: ServiceAccountKey,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            cached: RwLock::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    pub async fn access_token(&self) -> Result<String, WarehouseError> {
        let now = Utc::now();

        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.fetch_token(now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Signed RS256 assertion for the token endpoint.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, WarehouseError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: BIGQUERY_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| WarehouseError::Credentials(e.to_string()))?;

        jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| WarehouseError::Credentials(e.to_string()))
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken, WarehouseError> {
        let assertion = self.assertion(now)?;
        let form = [
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warning!("Service account token request failed with {}", status);
            return Err(WarehouseError::Credentials(format!(
                "token endpoint answered {status}: {message}"
            )));
        }

        let token: GoogleTokenResponse = response.json().await?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}
