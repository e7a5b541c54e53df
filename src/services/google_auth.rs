use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ServiceAccountCredentials;
use crate::error::{Error, Result};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google would reject them.
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
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed service-account assertion for an OAuth access token and
/// keeps it until shortly before expiry.
pub struct ServiceAccountAuth {
    client: Client,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(client: Client, token_uri: String) -> Self {
        Self {
            client,
            token_uri,
            cached: Mutex::new(None),
        }
    }

    pub fn sign_assertion(
        &self,
        credentials: &ServiceAccountCredentials,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let claims = AssertionClaims {
            iss: &credentials.email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Cached access token, exchanged again shortly before it expires.
    pub async fn access_token(&self, credentials: &ServiceAccountCredentials) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }
        let token = self.exchange(credentials).await?;
        *cached = Some(token.clone());
        Ok(token.access_token)
    }

    /// Signs and exchanges a new assertion regardless of the cache, so the
    /// token endpoint judges the credentials every time. The new token
    /// replaces the cached one.
    pub async fn fresh_token(&self, credentials: &ServiceAccountCredentials) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let token = match self.exchange(credentials).await {
            Ok(token) => token,
            Err(err) => {
                *cached = None;
                return Err(err);
            }
        };
        *cached = Some(token.clone());
        Ok(token.access_token)
    }

    async fn exchange(&self, credentials: &ServiceAccountCredentials) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.sign_assertion(credentials, now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);
            tracing::error!(%status, "service account token exchange rejected");
            return Err(Error::TokenExchange(format!("HTTP {}: {}", status, message)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = (token.expires_in - EXPIRY_MARGIN_SECS).max(0);
        tracing::debug!(expires_in = token.expires_in, "obtained Google access token");
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_rejects_a_non_pem_key() {
        let auth = ServiceAccountAuth::new(Client::new(), "https://oauth2.googleapis.com/token".into());
        let credentials = ServiceAccountCredentials {
            email: "svc@example.iam.gserviceaccount.com".into(),
            private_key: "not a key".into(),
            spreadsheet_id: "sheet".into(),
        };
        let err = auth.sign_assertion(&credentials, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::Jwt(_)));
    }
}
