//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles count every call so tests can assert which network
//! operations a pass would have performed.

#![allow(dead_code)]

use fwsync_core::config::{EngineConfig, TargetDefinition};
use fwsync_core::error::{Error, Result};
use fwsync_core::traits::{
    AccessToken, AllowListEntry, CreateOutcome, FirewallProvider, IpSource, TokenSource,
};
use fwsync_core::Reconciler;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_IP: [u8; 4] = [203, 0, 113, 5];

pub fn test_ip() -> IpAddr {
    IpAddr::from(TEST_IP)
}

/// An IP source returning a fixed result
#[derive(Clone)]
pub struct StaticIpSource {
    ip: Option<IpAddr>,
    calls: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose lookups always fail
    pub fn unavailable() -> Self {
        Self {
            ip: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip.ok_or_else(|| Error::transport("IP echo service timed out"))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// An IP source whose lookup never completes
pub struct PendingIpSource;

#[async_trait::async_trait]
impl IpSource for PendingIpSource {
    async fn current(&self) -> Result<IpAddr> {
        std::future::pending().await
    }
}

/// An IP source whose lookup panics
pub struct PanickingIpSource;

#[async_trait::async_trait]
impl IpSource for PanickingIpSource {
    async fn current(&self) -> Result<IpAddr> {
        panic!("IP source exploded")
    }
}

/// A token source that tracks calls and can reject given client ids
#[derive(Clone, Default)]
pub struct MockTokenSource {
    calls: Arc<AtomicUsize>,
    rejected_clients: Arc<Mutex<HashSet<String>>>,
}

impl MockTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_client(&self, client_id: &str) {
        self.rejected_clients
            .lock()
            .unwrap()
            .insert(client_id.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenSource for MockTokenSource {
    async fn acquire_token(
        &self,
        _issuer: &str,
        client_id: &str,
        _client_secret: &str,
    ) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rejected_clients.lock().unwrap().contains(client_id) {
            return Err(Error::auth("invalid_client"));
        }
        Ok(AccessToken::new(
            format!("token-for-{}", client_id),
            "Bearer",
            3599,
        ))
    }
}

/// How the mock provider answers create requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateBehavior {
    /// Conflict only when the name is already stored
    ByName,
    /// Every attempt conflicts
    AlwaysConflict,
    /// Every attempt fails with this status
    Reject(u16),
}

#[derive(Default)]
struct ProviderState {
    entries: Vec<AllowListEntry>,
    attempted_names: Vec<String>,
    list_calls: usize,
    create_calls: usize,
    failing_lists: HashSet<String>,
}

/// An in-memory firewall keyed by rule name, like the real API
#[derive(Clone)]
pub struct MockFirewallProvider {
    state: Arc<Mutex<ProviderState>>,
    behavior: CreateBehavior,
}

impl MockFirewallProvider {
    pub fn new() -> Self {
        Self::with_behavior(CreateBehavior::ByName)
    }

    pub fn with_behavior(behavior: CreateBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
            behavior,
        }
    }

    /// Pre-populate an entry
    pub fn insert(&self, name: &str, start: &str, end: &str) {
        let mut state = self.state.lock().unwrap();
        let id = format!("rule-{}", state.entries.len());
        state.entries.push(entry(&id, name, start, end));
    }

    /// Make listing fail for one target
    pub fn fail_list_for(&self, target: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(target.to_string());
    }

    pub fn entries(&self) -> Vec<AllowListEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn attempted_names(&self) -> Vec<String> {
        self.state.lock().unwrap().attempted_names.clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn create_call_count(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }
}

#[async_trait::async_trait]
impl FirewallProvider for MockFirewallProvider {
    async fn list_entries(
        &self,
        target: &TargetDefinition,
        _token: &AccessToken,
    ) -> Result<Vec<AllowListEntry>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.failing_lists.contains(&target.name) {
            return Err(Error::rejected(403, "AuthorizationFailed"));
        }
        Ok(state.entries.clone())
    }

    async fn create_entry(
        &self,
        _target: &TargetDefinition,
        _token: &AccessToken,
        name: &str,
        start_ip: IpAddr,
        end_ip: IpAddr,
    ) -> Result<CreateOutcome> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.attempted_names.push(name.to_string());

        match self.behavior {
            CreateBehavior::AlwaysConflict => Ok(CreateOutcome::NameConflict),
            CreateBehavior::Reject(status) => Err(Error::rejected(status, "InternalServerError")),
            CreateBehavior::ByName => {
                if state.entries.iter().any(|e| e.name == name) {
                    return Ok(CreateOutcome::NameConflict);
                }
                let id = format!("rule-{}", state.entries.len());
                let created = entry(&id, name, &start_ip.to_string(), &end_ip.to_string());
                state.entries.push(created.clone());
                Ok(CreateOutcome::Created(created))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn entry(id: &str, name: &str, start: &str, end: &str) -> AllowListEntry {
    AllowListEntry {
        id: id.to_string(),
        name: name.to_string(),
        start_ip_address: start.to_string(),
        end_ip_address: end.to_string(),
        location: None,
        entry_type: None,
    }
}

/// A target with complete credentials
pub fn usable_target(name: &str) -> TargetDefinition {
    TargetDefinition::new(
        name,
        "rg-prod",
        format!("{}-sql", name.to_lowercase()),
        "tenant-1",
        format!("client-{}", name),
        "s3cr3t",
        "sub-1",
    )
}

/// A target with no client secret
pub fn target_without_secret(name: &str) -> TargetDefinition {
    let mut target = usable_target(name);
    target.client_secret.clear();
    target
}

/// A target with no subscription id
pub fn target_without_subscription(name: &str) -> TargetDefinition {
    let mut target = usable_target(name);
    target.subscription_id.clear();
    target
}

/// Build a reconciler from cloned handles of the doubles
pub fn reconciler(
    ip_source: &StaticIpSource,
    tokens: &MockTokenSource,
    provider: &MockFirewallProvider,
    max_create_attempts: u32,
) -> Reconciler {
    let config = EngineConfig {
        max_create_attempts,
        ..EngineConfig::default()
    };

    Reconciler::new(
        Box::new(ip_source.clone()),
        Box::new(tokens.clone()),
        Box::new(provider.clone()),
        &config,
    )
    .expect("reconciler construction succeeds")
}
