// # Firewall Provider Trait
//
// Defines the interface for reading and creating allow-list entries on a
// target's remote firewall.
//
// ## Implementations
//
// - Azure Resource Manager: `fwsync-provider-azure` crate
//
// ## Usage
//
// ```rust,ignore
// use fwsync_core::FirewallProvider;
//
// let entries = provider.list_entries(&target, &token).await?;
// match provider.create_entry(&target, &token, "Automatic IP", ip, ip).await? {
//     CreateOutcome::Created(entry) => println!("created {}", entry.name),
//     CreateOutcome::NameConflict => println!("name taken"),
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::config::TargetDefinition;
use crate::traits::AccessToken;

/// One named `{start, end}` range on a target's firewall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    /// Remote-assigned identifier
    pub id: String,
    /// Name, unique within the target's rule set
    pub name: String,
    /// First address of the range
    pub start_ip_address: String,
    /// Last address of the range
    pub end_ip_address: String,
    /// Optional location metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Optional resource type metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
}

impl AllowListEntry {
    /// Whether this entry is exactly the single-address range `[ip, ip]`
    ///
    /// A broader range that happens to contain `ip` does not count.
    pub fn is_single_address(&self, ip: IpAddr) -> bool {
        let start = self.start_ip_address.trim().parse::<IpAddr>();
        let end = self.end_ip_address.trim().parse::<IpAddr>();
        matches!((start, end), (Ok(s), Ok(e)) if s == ip && e == ip)
    }
}

/// Result of a single creation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The entry was created under the requested name
    Created(AllowListEntry),
    /// The requested name is already taken (HTTP 409)
    ///
    /// This is a name collision, not an address collision.
    NameConflict,
}

/// Trait for firewall provider implementations
///
/// # Trust Level: Untrusted
///
/// Providers are isolated, stateless, and single-shot:
/// - One HTTP request per call
/// - No retry logic (the name-conflict loop is owned by `Reconciler`)
/// - No decisions about whether an entry is needed
/// - No caching beyond a single request
///
/// A name conflict is reported as `Ok(CreateOutcome::NameConflict)`;
/// every other failure is an `Err`.
#[async_trait]
pub trait FirewallProvider: Send + Sync {
    /// List the current allow-list entries of a target
    ///
    /// An empty list is a valid result, distinct from failure.
    /// Pagination links are not followed.
    async fn list_entries(
        &self,
        target: &TargetDefinition,
        token: &AccessToken,
    ) -> Result<Vec<AllowListEntry>, crate::Error>;

    /// Attempt to create an entry under `name`
    ///
    /// # Returns
    ///
    /// - `Ok(CreateOutcome::Created(entry))`: 2xx with the created entry
    /// - `Ok(CreateOutcome::NameConflict)`: 409
    /// - `Err(Error)`: Any other status, transport error, or timeout
    async fn create_entry(
        &self,
        target: &TargetDefinition,
        token: &AccessToken,
        name: &str,
        start_ip: IpAddr,
        end_ip: IpAddr,
    ) -> Result<CreateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
