// # IP Source Trait
//
// Defines the interface for discovering the caller's externally-visible
// IP address.
//
// ## Implementations
//
// - HTTP IP-echo: `fwsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use fwsync_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("Public IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP source implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Caching
///
/// Implementations may cache the resolved address for a bounded time.
/// A cached value must never be returned after its expiry: once the
/// cache is stale, a failed refresh is reported as an error rather than
/// falling back to the expired address.
///
/// # Concurrency
///
/// Concurrent callers racing on an expired cache may each issue a lookup.
/// Results are idempotent, so no de-duplication is required.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current public IP address
    /// - `Err(Error)`: The address is unavailable (transport error, timeout,
    ///   non-success status, unparseable body)
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str {
        "unknown"
    }
}
