// # Token Source Trait
//
// Defines the interface for exchanging a target's client credentials for a
// short-lived bearer token.
//
// ## Lifecycle
//
// A token is requested fresh for every reconciliation attempt of a target,
// used for exactly the list and create calls of that attempt, then dropped.
// Tokens are never cached, persisted, or shared across targets or runs.
//
// ## Implementations
//
// - OAuth2 client-credentials flow: `fwsync-provider-azure` crate

use async_trait::async_trait;
use serde::Deserialize;

/// Opaque bearer token returned by the issuer
///
/// The `Debug` implementation intentionally does NOT expose the token.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    /// The bearer string
    /// ⚠️ NEVER log this value
    access_token: String,

    /// Token kind (normally "Bearer")
    token_type: String,

    /// Declared lifetime in seconds
    expires_in: u64,
}

impl AccessToken {
    /// Create a new access token
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
        }
    }

    /// The bearer string, for the Authorization header only
    pub fn secret(&self) -> &str {
        &self.access_token
    }

    /// Token kind
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Declared lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<REDACTED>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Trait for token source implementations
///
/// # Trust Level: Untrusted
///
/// Token sources perform one exchange per call:
/// - No caching (every call performs a full exchange)
/// - No retry (retry policy, if any, belongs to the caller)
/// - Any non-2xx status, parse failure, timeout, or transport error is an `Err`
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Exchange client credentials for an access token
    ///
    /// # Parameters
    ///
    /// - `issuer`: Tenant / issuer identifier
    /// - `client_id`: Client identifier
    /// - `client_secret`: Client secret
    async fn acquire_token(
        &self,
        issuer: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<AccessToken, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_not_exposed_in_debug() {
        let token = AccessToken::new("eyJ0eXAiOiJKV1Qi", "Bearer", 3599);
        let debug_str = format!("{:?}", token);
        assert!(!debug_str.contains("eyJ0eXAiOiJKV1Qi"));
        assert!(debug_str.contains("Bearer"));
    }

    #[test]
    fn test_token_deserializes_from_issuer_response() {
        let token: AccessToken = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":3599,"ext_expires_in":3599}"#,
        )
        .unwrap();

        assert_eq!(token.secret(), "abc");
        assert_eq!(token.token_type(), "Bearer");
        assert_eq!(token.expires_in(), 3599);
    }
}
