use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::{Config, Credentials, TokenPolicy};
use crate::error::{MailError, Result};

/// Bearer token issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// True once `now + skew` reaches the expiry. Tokens without expiry never expire.
    pub fn is_expired(&self, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                chrono::Duration::from_std(skew)
                    .ok()
                    .and_then(|skew| Utc::now().checked_add_signed(skew))
                    .map_or(true, |deadline| deadline >= expires_at)
            }
            None => false,
        }
    }
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth2 error body (`error`, `error_description`)
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn token_from_response(resp: TokenResponse, now: DateTime<Utc>) -> Result<AccessToken> {
    if resp.access_token.is_empty() {
        return Err(MailError::Authentication("no access_token in response".to_string()));
    }

    let expires_at = match resp.expires_in {
        Some(secs) => Some(
            chrono::TimeDelta::try_seconds(secs)
                .and_then(|delta| now.checked_add_signed(delta))
                .ok_or_else(|| {
                    MailError::Authentication(format!("expires_in out of range: {}", secs))
                })?,
        ),
        None => None,
    };

    Ok(AccessToken {
        value: resp.access_token,
        token_type: resp.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_at,
    })
}

/// Client-credentials token source
pub struct Authenticator {
    client: Client,
    token_url: String,
    credentials: Credentials,
    scope: String,
    policy: TokenPolicy,
    cached: Mutex<Option<AccessToken>>,
}

impl Authenticator {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &Config, client: Client) -> Self {
        Self {
            client,
            token_url: config.token_url(),
            credentials: config.credentials.clone(),
            scope: config.scopes.join(" "),
            policy: config.token_policy,
            cached: Mutex::new(None),
        }
    }

    /// Token to use for the next request, honouring the configured policy.
    pub async fn token(&self) -> Result<AccessToken> {
        let refresh_skew = match self.policy {
            TokenPolicy::FetchPerRequest => return self.authenticate().await,
            TokenPolicy::CacheUntilExpiry { refresh_skew } => refresh_skew,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(refresh_skew) {
                tracing::debug!("Reusing cached access token");
                return Ok(token.clone());
            }
            tracing::info!(expires_at = ?token.expires_at, "Access token expiring, fetching a new one");
        }

        let token = self.authenticate().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    /// One POST to the token endpoint with the client-credentials grant.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        tracing::debug!(url = %self.token_url, "Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MailError::Authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MailError::Authentication(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            let error = serde_json::from_str::<TokenErrorResponse>(&text)
                .ok()
                .and_then(|body| body.error_description.or(body.error))
                .unwrap_or(text);
            tracing::warn!(status = %status, "Token endpoint rejected credentials");
            return Err(MailError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, error
            )));
        }

        let body: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| MailError::Authentication(format!("invalid token response: {}", e)))?;
        let token = token_from_response(body, Utc::now())?;

        tracing::info!(expires_at = ?token.expires_at, "Access token acquired");
        Ok(token)
    }
}
