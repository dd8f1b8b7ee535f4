//! OAuth2 client-credentials token management for the Amadeus API.
//!
//! Tokens are cached until shortly before their reported expiry; the
//! refresh happens under the token mutex, so concurrent callers share
//! one token request instead of racing the endpoint.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use common::{Error, Result};

/// Refresh this many seconds before the provider-reported expiry.
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn from_response(resp: TokenResponse) -> Self {
        let lifetime = Duration::from_secs(resp.expires_in.saturating_sub(EXPIRY_MARGIN_SECS));
        Self {
            access_token: resp.access_token,
            expires_at: Instant::now() + lifetime,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Holds Amadeus API credentials and the cached bearer token.
#[derive(Debug)]
pub struct TokenManager {
    api_key: String,
    api_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            token: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, fetching a fresh one if needed.
    pub async fn bearer_token(&self, client: &reqwest::Client, base_url: &str) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting Amadeus access token");

        let resp = client
            .post(format!("{base_url}/v1/security/oauth2/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token endpoint returned {}: {}",
                status,
                &body[..body.len().min(500)]
            )));
        }

        let data: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Auth(format!("token parse error: {e}")))?;

        let token = CachedToken::from_response(data);
        let access_token = token.access_token.clone();
        *guard = Some(token);

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_not_expired() {
        let token = CachedToken::from_response(TokenResponse {
            access_token: "tok".into(),
            expires_in: 1799,
        });
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiry_margin_consumes_short_lifetimes() {
        // A token with a lifetime inside the safety margin is treated as
        // already expired, forcing a refetch on next use.
        let token = CachedToken::from_response(TokenResponse {
            access_token: "tok".into(),
            expires_in: 30,
        });
        assert!(token.is_expired());
    }
}
