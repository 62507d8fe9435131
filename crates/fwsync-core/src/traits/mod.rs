//! Core traits for the firewall sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the caller's public IP address
//! - [`TokenSource`]: Exchange client credentials for a bearer token
//! - [`FirewallProvider`]: List and create allow-list entries

pub mod ip_source;
pub mod token_source;
pub mod firewall_provider;

pub use ip_source::IpSource;
pub use token_source::{AccessToken, TokenSource};
pub use firewall_provider::{AllowListEntry, CreateOutcome, FirewallProvider};
