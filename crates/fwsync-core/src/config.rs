//! Configuration types for the firewall sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default IP-echo service
pub const DEFAULT_IP_SOURCE_URL: &str = "https://api.ipify.org";

/// Default base name for rules created by the reconciler
pub const DEFAULT_RULE_BASE_NAME: &str = "Automatic IP";

/// Upper bound for `ip_source.cache_ttl_secs` (one day)
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Upper bound for `engine.max_create_attempts`
pub const MAX_CREATE_ATTEMPTS: u32 = 10_000;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FwSyncConfig {
    /// Managed targets, keyed by logical name
    #[serde(default)]
    pub targets: Vec<TargetDefinition>,

    /// Public IP source settings
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Remote management API settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl FwSyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            ip_source: IpSourceConfig::default(),
            provider: ProviderConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Find a target by its logical name
    pub fn target(&self, name: &str) -> Option<&TargetDefinition> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Validate the configuration
    ///
    /// Targets with missing credentials are not an error here; they are
    /// skipped at reconciliation time.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(crate::Error::config("Target name cannot be empty"));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(crate::Error::config(format!(
                    "Duplicate target name: {}",
                    target.name
                )));
            }
        }

        self.ip_source.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

impl Default for FwSyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One managed remote resource
///
/// The `Debug` implementation redacts the client secret.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetDefinition {
    /// Logical name (unique key)
    pub name: String,

    /// Resource group containing the server
    pub resource_group: String,

    /// Server (resource) identifier
    pub server: String,

    /// Tenant the service principal belongs to
    pub tenant_id: String,

    /// Service principal client id
    pub client_id: String,

    /// Service principal client secret
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub client_secret: String,

    /// Subscription the resource group lives in
    #[serde(default)]
    pub subscription_id: String,
}

impl TargetDefinition {
    /// Create a target definition
    pub fn new(
        name: impl Into<String>,
        resource_group: impl Into<String>,
        server: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            server: server.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            subscription_id: subscription_id.into(),
        }
    }

    /// A target is usable only when both the secret and the subscription are set
    pub fn is_usable(&self) -> bool {
        !self.client_secret.is_empty() && !self.subscription_id.is_empty()
    }

    /// Secret-free view for listings
    pub fn summary(&self) -> TargetSummary {
        TargetSummary {
            name: self.name.clone(),
            resource_group: self.resource_group.clone(),
            server: self.server.clone(),
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            subscription_id: self.subscription_id.clone(),
            has_client_secret: !self.client_secret.is_empty(),
            usable: self.is_usable(),
        }
    }
}

impl std::fmt::Debug for TargetDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetDefinition")
            .field("name", &self.name)
            .field("resource_group", &self.resource_group)
            .field("server", &self.server)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// Target as exposed on the administrative surface (no secret)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSummary {
    pub name: String,
    pub resource_group: String,
    pub server: String,
    pub tenant_id: String,
    pub client_id: String,
    pub subscription_id: String,
    pub has_client_secret: bool,
    pub usable: bool,
}

/// Public IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL of the IP-echo service (plain-text body)
    #[serde(default = "default_ip_source_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_ip_timeout_secs")]
    pub timeout_secs: u64,

    /// How long a resolved address is reused, in seconds
    #[serde(default = "default_ip_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("IP source URL", &self.url)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP source timeout must be > 0"));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(crate::Error::config(format!(
                "IP cache TTL must be at most {} seconds. Got: {}",
                MAX_CACHE_TTL_SECS, self.cache_ttl_secs
            )));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_source_url(),
            timeout_secs: default_ip_timeout_secs(),
            cache_ttl_secs: default_ip_cache_ttl_secs(),
        }
    }
}

/// Remote management API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identity platform base URL (token issuer host)
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,

    /// Resource manager base URL
    #[serde(default = "default_management_endpoint")]
    pub management_endpoint: String,

    /// Scope requested in the client-credentials exchange
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Provider namespace and resource type of the server
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// API version sent with every management request
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("Login endpoint", &self.login_endpoint)?;
        validate_http_url("Management endpoint", &self.management_endpoint)?;
        if self.scope.is_empty() {
            return Err(crate::Error::config("Token scope cannot be empty"));
        }
        if self.resource_type.is_empty() {
            return Err(crate::Error::config("Resource type cannot be empty"));
        }
        if self.api_version.is_empty() {
            return Err(crate::Error::config("API version cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            login_endpoint: default_login_endpoint(),
            management_endpoint: default_management_endpoint(),
            scope: default_scope(),
            resource_type: default_resource_type(),
            api_version: default_api_version(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name given to the first creation attempt; retries append " - {n}"
    #[serde(default = "default_rule_base_name")]
    pub rule_base_name: String,

    /// Maximum number of renamed retries after name conflicts
    #[serde(default = "default_max_create_attempts")]
    pub max_create_attempts: u32,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.rule_base_name.trim().is_empty() {
            return Err(crate::Error::config("Rule base name cannot be empty"));
        }
        if self.max_create_attempts == 0 || self.max_create_attempts > MAX_CREATE_ATTEMPTS {
            return Err(crate::Error::config(format!(
                "max_create_attempts must be between 1 and {}. Got: {}",
                MAX_CREATE_ATTEMPTS, self.max_create_attempts
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_base_name: default_rule_base_name(),
            max_create_attempts: default_max_create_attempts(),
        }
    }
}

fn validate_http_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn default_ip_source_url() -> String {
    DEFAULT_IP_SOURCE_URL.to_string()
}

fn default_ip_timeout_secs() -> u64 {
    5
}

fn default_ip_cache_ttl_secs() -> u64 {
    300
}

fn default_login_endpoint() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_management_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_scope() -> String {
    "https://management.azure.com/.default".to_string()
}

fn default_resource_type() -> String {
    "Microsoft.Sql/servers".to_string()
}

fn default_api_version() -> String {
    "2021-11-01".to_string()
}

fn default_rule_base_name() -> String {
    DEFAULT_RULE_BASE_NAME.to_string()
}

fn default_max_create_attempts() -> u32 {
    100
}
