//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Resolving the public IP once per pass
//! - Acquiring a fresh token per target
//! - Listing the target's allow-list entries
//! - Creating an entry for the current IP when none matches
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │─── once per pass ───┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  Reconciler  │── for each target, in order
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐           ┌──────────────────┐         ┌──────────────────┐
//! │ TokenSource │           │ FirewallProvider │         │ FirewallProvider │
//! │ (acquire)   │           │ (list)           │         │ (create, loop)   │
//! └─────────────┘           └──────────────────┘         └──────────────────┘
//! ```
//!
//! ## Per-target state machine
//!
//! 1. Credentials missing → `SkippedMissingCredential`
//! 2. Token exchange fails → `Failed(token)`
//! 3. Listing fails → `Failed(list)`
//! 4. An entry with start == end == IP exists → `AlreadyPresent`
//! 5. Otherwise create under the base name, renaming on conflict →
//!    `Created` or `Failed(create)`
//!
//! Targets are processed sequentially and independently; one target's
//! failure never stops the pass.

pub mod job;
pub mod outcome;

pub use job::{JobResult, ReconcileJob};
pub use outcome::{FailureStage, OutcomeStatus, ReconciliationOutcome, ReconciliationReport};

use crate::config::{EngineConfig, TargetDefinition};
use crate::error::{Error, Result};
use crate::traits::{AccessToken, AllowListEntry, CreateOutcome, FirewallProvider, IpSource, TokenSource};
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

/// Name used for the creation attempt following `attempt` conflicts
///
/// Attempt 0 uses the base name unchanged.
pub fn candidate_rule_name(base_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        base_name.to_string()
    } else {
        format!("{} - {}", base_name, attempt)
    }
}

/// Core reconciliation engine
///
/// Composes an [`IpSource`], a [`TokenSource`] and a [`FirewallProvider`].
/// Holds no mutable state of its own; share it behind an `Arc`.
pub struct Reconciler {
    /// Public IP discovery
    ip_source: Box<dyn IpSource>,

    /// Credential exchange
    tokens: Box<dyn TokenSource>,

    /// Remote allow-list API
    provider: Box<dyn FirewallProvider>,

    /// Name for newly created entries
    rule_base_name: String,

    /// Renamed retries allowed after name conflicts
    max_create_attempts: u32,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_source`: Public IP source implementation
    /// - `tokens`: Token source implementation
    /// - `provider`: Firewall provider implementation
    /// - `config`: Engine settings
    pub fn new(
        ip_source: Box<dyn IpSource>,
        tokens: Box<dyn TokenSource>,
        provider: Box<dyn FirewallProvider>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ip_source,
            tokens,
            provider,
            rule_base_name: config.rule_base_name.clone(),
            max_create_attempts: config.max_create_attempts,
        })
    }

    /// Resolve the current public IP
    pub async fn public_ip(&self) -> Result<IpAddr> {
        self.ip_source.current().await
    }

    /// Run one orchestration pass over `targets`
    ///
    /// The public IP is resolved at most once and shared by all targets.
    /// Targets with missing credentials are skipped without any network
    /// call; when no target is usable the IP is not resolved at all.
    pub async fn reconcile_all(&self, targets: &[TargetDefinition]) -> ReconciliationReport {
        info!("Starting reconciliation pass for {} target(s)", targets.len());

        let public_ip = if targets.iter().any(TargetDefinition::is_usable) {
            match self.public_ip().await {
                Ok(ip) => {
                    info!("Public IP resolved: {}", ip);
                    Ok(ip)
                }
                Err(e) => {
                    error!("Public IP unavailable via {}: {}", self.ip_source.source_name(), e);
                    Err(e)
                }
            }
        } else {
            Err(Error::incomplete("no usable targets"))
        };

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let status = match (&public_ip, target.is_usable()) {
                (_, false) => self.reconcile_target_with(target, None).await,
                (Ok(ip), true) => self.reconcile_target_with(target, Some(*ip)).await,
                (Err(e), true) => OutcomeStatus::failed(FailureStage::Ip, e),
            };

            let outcome = ReconciliationOutcome::new(
                target.name.clone(),
                public_ip.as_ref().ok().copied(),
                status,
            );
            log_outcome(&outcome);
            outcomes.push(outcome);
        }

        let report = ReconciliationReport {
            public_ip: public_ip.ok(),
            outcomes,
        };

        info!(
            "Reconciliation pass finished: {} created, {} present, {} skipped, {} failed",
            report.created(),
            report.already_present(),
            report.skipped(),
            report.failed()
        );

        report
    }

    /// Reconcile a single target against a known public IP
    pub async fn reconcile_target(&self, target: &TargetDefinition, public_ip: IpAddr) -> OutcomeStatus {
        self.reconcile_target_with(target, Some(public_ip)).await
    }

    async fn reconcile_target_with(&self, target: &TargetDefinition, public_ip: Option<IpAddr>) -> OutcomeStatus {
        if !target.is_usable() {
            return OutcomeStatus::SkippedMissingCredential;
        }
        let Some(ip) = public_ip else {
            return OutcomeStatus::Failed {
                stage: FailureStage::Ip,
                reason: "public IP unknown".to_string(),
            };
        };

        let token = match self.acquire_token(target).await {
            Ok(token) => token,
            Err(e) => return OutcomeStatus::failed(FailureStage::Token, &e),
        };

        let entries = match self.provider.list_entries(target, &token).await {
            Ok(entries) => entries,
            Err(e) => return OutcomeStatus::failed(FailureStage::List, &e),
        };
        debug!("Target {} has {} existing entries", target.name, entries.len());

        if let Some(existing) = entries.iter().find(|entry| entry.is_single_address(ip)) {
            return OutcomeStatus::AlreadyPresent {
                rule_name: existing.name.clone(),
            };
        }

        match self
            .ensure_entry(target, &token, &self.rule_base_name, ip, ip, self.max_create_attempts)
            .await
        {
            Ok(entry) => OutcomeStatus::Created { rule_name: entry.name },
            Err(e) => OutcomeStatus::failed(FailureStage::Create, &e),
        }
    }

    /// Create an entry, renaming on each name conflict
    ///
    /// Tries `base_name`, then `"{base_name} - 1"`, `"{base_name} - 2"`, …
    /// One request is outstanding at a time and nothing is re-listed
    /// between attempts. Fails once more than `max_attempts` renamed
    /// retries have conflicted, or immediately on any non-conflict error.
    pub async fn ensure_entry(
        &self,
        target: &TargetDefinition,
        token: &AccessToken,
        base_name: &str,
        start_ip: IpAddr,
        end_ip: IpAddr,
        max_attempts: u32,
    ) -> Result<AllowListEntry> {
        let mut attempt: u32 = 0;
        let mut candidate = candidate_rule_name(base_name, attempt);

        loop {
            match self
                .provider
                .create_entry(target, token, &candidate, start_ip, end_ip)
                .await?
            {
                CreateOutcome::Created(entry) => return Ok(entry),
                CreateOutcome::NameConflict => {
                    attempt = match attempt.checked_add(1).filter(|next| *next <= max_attempts) {
                        Some(next) => next,
                        None => {
                            return Err(Error::conflict(format!(
                                "rule name '{}' and {} renamed variants are all taken",
                                base_name, max_attempts
                            )));
                        }
                    };
                    candidate = candidate_rule_name(base_name, attempt);
                    debug!(
                        "Rule name taken on {}, retrying as '{}'",
                        target.name, candidate
                    );
                }
            }
        }
    }

    /// Acquire a token and list a target's entries
    pub async fn list_target_entries(&self, target: &TargetDefinition) -> Result<Vec<AllowListEntry>> {
        if !target.is_usable() {
            return Err(Error::incomplete(format!(
                "target {} is missing its client secret or subscription",
                target.name
            )));
        }
        let token = self.acquire_token(target).await?;
        self.provider.list_entries(target, &token).await
    }

    async fn acquire_token(&self, target: &TargetDefinition) -> Result<AccessToken> {
        self.tokens
            .acquire_token(&target.tenant_id, &target.client_id, &target.client_secret)
            .await
    }
}

fn log_outcome(outcome: &ReconciliationOutcome) {
    match &outcome.status {
        OutcomeStatus::Created { .. } | OutcomeStatus::AlreadyPresent { .. } => info!("{}", outcome),
        OutcomeStatus::SkippedMissingCredential => warn!("{}", outcome),
        OutcomeStatus::Failed { .. } => error!("{}", outcome),
    }
}
