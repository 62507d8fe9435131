// # Public IP Cache
//
// Single-slot, in-memory cache for the resolved public IP address.
//
// ## Semantics
//
// - One entry, not keyed per caller
// - Overwritten on each successful refresh, read-only in between
// - A value is served only while its expiry lies in the future
// - A failed refresh leaves the slot untouched
//
// ## Crash Behavior
//
// Nothing is persisted. After a restart the first resolution always goes
// to the network.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A cached address with its expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedIp {
    /// The resolved address
    pub value: IpAddr,
    /// Instant after which the value must not be served
    pub expires_at: DateTime<Utc>,
}

impl CachedIp {
    /// Whether the entry is still fresh at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Single-slot IP cache owned by a resolver instance
///
/// Cloning yields a handle to the same slot.
///
/// # Example
///
/// ```rust,no_run
/// use fwsync_core::cache::IpCache;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = IpCache::new();
///
///     let expiry = chrono::Utc::now() + chrono::Duration::minutes(5);
///     cache.set("203.0.113.5".parse()?, expiry).await;
///
///     assert_eq!(cache.get().await, Some("203.0.113.5".parse()?));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct IpCache {
    slot: Arc<RwLock<Option<CachedIp>>>,
}

impl IpCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached address if it has not expired
    pub async fn get(&self) -> Option<IpAddr> {
        self.get_at(Utc::now()).await
    }

    /// Get the cached address if it is still fresh at `now`
    pub async fn get_at(&self, now: DateTime<Utc>) -> Option<IpAddr> {
        let guard = self.slot.read().await;
        guard
            .filter(|cached| cached.is_fresh_at(now))
            .map(|cached| cached.value)
    }

    /// Replace the slot with a new value and expiry
    pub async fn set(&self, value: IpAddr, expires_at: DateTime<Utc>) {
        let mut guard = self.slot.write().await;
        *guard = Some(CachedIp { value, expires_at });
    }

    /// Inspect the slot, stale or not
    pub async fn peek(&self) -> Option<CachedIp> {
        *self.slot.read().await
    }

    /// Empty the slot
    pub async fn clear(&self) {
        let mut guard = self.slot.write().await;
        *guard = None;
    }
}
