//! OAuth2 client-credentials token source for the Microsoft identity platform.

use async_trait::async_trait;
use fwsync_core::config::ProviderConfig;
use fwsync_core::traits::{AccessToken, TokenSource};
use fwsync_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, instrument};

/// Timeout for token exchanges (30 seconds)
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-credentials token source
///
/// Every call performs a full exchange; nothing is cached. Credentials are
/// passed per call and never stored.
#[derive(Debug, Clone)]
pub struct AzureTokenSource {
    /// Identity platform base URL
    login_endpoint: String,

    /// Scope requested for every token
    scope: String,

    /// HTTP client for token requests
    client: reqwest::Client,
}

impl AzureTokenSource {
    /// Create a token source from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            login_endpoint: config.login_endpoint.trim_end_matches('/').to_string(),
            scope: config.scope.clone(),
            client,
        })
    }

    fn token_url(&self, issuer: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint,
            urlencoding::encode(issuer)
        )
    }
}

#[async_trait]
impl TokenSource for AzureTokenSource {
    #[instrument(skip(self, client_secret))]
    async fn acquire_token(
        &self,
        issuer: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url(issuer))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("Failed to parse token response: {}", e)))?;

        debug!(
            "Acquired {} token, expires in {}s",
            token.token_type(),
            token.expires_in()
        );

        Ok(token)
    }
}
