// # HTTP IP Source
//
// This crate provides the public IP source for the firewall sync system.
//
// ## Architecture
//
// Fetches the caller's externally-visible address from an IP-echo service
// (plain-text body, e.g. api.ipify.org) and caches it for a fixed TTL.
//
// - Cache hit: no network call
// - Cache miss or expired: one GET with a short timeout (5 seconds)
// - Success: trim, parse, store with a new expiry (5 minutes), return
// - Failure: return an error and leave the slot untouched; an expired
//   value is never served as a fallback

use fwsync_core::cache::IpCache;
use fwsync_core::config::IpSourceConfig;
use fwsync_core::traits::IpSource;
use fwsync_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default request timeout for the IP-echo service
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lifetime of a resolved address
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// HTTP-based public IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// How long a resolved address is reused
    cache_ttl: chrono::Duration,

    /// Single-slot cache owned by this source
    cache: IpCache,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source with the default timeout and TTL
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_settings(url, DEFAULT_TIMEOUT, DEFAULT_CACHE_TTL)
    }

    /// Create with a custom timeout and cache TTL
    pub fn with_settings(url: impl Into<String>, timeout: Duration, cache_ttl: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let cache_ttl = chrono::Duration::from_std(cache_ttl)
            .map_err(|e| Error::config(format!("Invalid cache TTL: {}", e)))?;

        Ok(Self {
            url: url.into(),
            cache_ttl,
            cache: IpCache::new(),
            client,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        config.validate()?;
        Self::with_settings(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// The cache backing this source
    pub fn cache(&self) -> &IpCache {
        &self.cache
    }

    /// Fetch current IP from HTTP service
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("IP lookup request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::rejected(
                response.status().as_u16(),
                format!("IP lookup returned {}", response.status()),
            ));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read IP lookup response: {}", e)))?;

        let ip_text = ip_text.trim();

        ip_text
            .parse()
            .map_err(|_| Error::parse(format!("Invalid IP address: {}", ip_text)))
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        if let Some(ip) = self.cache.get().await {
            tracing::debug!("Using cached public IP {}", ip);
            return Ok(ip);
        }

        match self.fetch_ip().await {
            Ok(ip) => {
                let expires_at = chrono::Utc::now()
                    .checked_add_signed(self.cache_ttl)
                    .ok_or_else(|| Error::config("IP cache TTL overflows the clock"))?;
                self.cache.set(ip, expires_at).await;
                tracing::debug!("Public IP refreshed: {} (valid until {})", ip, expires_at);
                Ok(ip)
            }
            Err(e) => {
                tracing::warn!("Public IP lookup via {} failed: {}", self.url, e);
                Err(e)
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
