// # fwsync-core
//
// Core library for keeping remote firewall allow-lists in sync with the
// caller's public IP address.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the current public IP
// - **TokenSource**: Trait for exchanging client credentials for a bearer token
// - **FirewallProvider**: Trait for listing and creating allow-list entries
// - **Reconciler**: Core engine that orchestrates IP → token → list → create
// - **IpCache**: Single-slot cache for the resolved IP
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single-Shot Providers**: Providers never retry; the only retry (rule
//    name conflicts) lives in the engine
// 3. **Outcomes, not Exceptions**: Every target ends in an explicit outcome
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: An existing rule for the current IP is never duplicated

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod cache;

// Re-export core types for convenience
pub use traits::{IpSource, TokenSource, FirewallProvider, AccessToken, AllowListEntry, CreateOutcome};
pub use engine::{
    FailureStage, JobResult, OutcomeStatus, ReconcileJob, Reconciler, ReconciliationOutcome,
    ReconciliationReport,
};
pub use config::{FwSyncConfig, TargetDefinition, TargetSummary, IpSourceConfig, ProviderConfig, EngineConfig};
pub use error::{Error, Result};
pub use cache::IpCache;
