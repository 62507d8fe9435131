// # Azure Firewall Provider
//
// This crate provides the Azure Resource Manager implementation of the
// firewall provider and the client-credentials token source.
//
// ## Behavior
//
// - ✅ One HTTP request per call (list = GET, create = PUT)
// - ✅ HTTP timeouts: 30 seconds for tokens, 60 seconds for rules
// - ✅ 409 on create reported as `CreateOutcome::NameConflict`
// - ❌ NO retry logic (the rename-on-conflict loop is owned by Reconciler)
// - ❌ NO token caching (a fresh token is exchanged per reconciliation)
// - ❌ NO pagination (`nextLink` is logged, not followed)
//
// ## Security Requirements
//
// - Client secrets and bearer tokens NEVER appear in logs or errors
//
// ## API Reference
//
// - Token: POST `{login}/{tenant}/oauth2/v2.0/token`
// - List: GET `/subscriptions/{sub}/resourceGroups/{rg}/providers/{type}/{server}/firewallRules`
// - Create: PUT `.../firewallRules/{name}` with `{properties:{startIpAddress,endIpAddress}}`

pub mod token;

pub use token::AzureTokenSource;

use async_trait::async_trait;
use fwsync_core::config::{ProviderConfig, TargetDefinition};
use fwsync_core::traits::{AccessToken, AllowListEntry, CreateOutcome, FirewallProvider};
use fwsync_core::{Error, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// HTTP timeout for firewall-rule requests (60 seconds)
pub const RULES_TIMEOUT: Duration = Duration::from_secs(60);

/// Firewall rule list as returned by the management API
#[derive(Debug, Deserialize)]
struct RuleListResponse {
    #[serde(default)]
    value: Vec<RuleResource>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// One firewall rule resource
#[derive(Debug, Deserialize)]
struct RuleResource {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
    #[serde(default)]
    location: Option<String>,
    properties: RuleProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleProperties {
    #[serde(default)]
    start_ip_address: String,
    #[serde(default)]
    end_ip_address: String,
}

impl From<RuleResource> for AllowListEntry {
    fn from(rule: RuleResource) -> Self {
        AllowListEntry {
            id: rule.id,
            name: rule.name,
            start_ip_address: rule.properties.start_ip_address,
            end_ip_address: rule.properties.end_ip_address,
            location: rule.location,
            entry_type: rule.resource_type,
        }
    }
}

/// Azure firewall-rule provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. The bearer token
/// is passed per call and never stored.
#[derive(Debug, Clone)]
pub struct AzureFirewallProvider {
    /// Resource manager base URL
    management_endpoint: String,

    /// Provider namespace and type, e.g. "Microsoft.Sql/servers"
    resource_type: String,

    /// API version query parameter
    api_version: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl AzureFirewallProvider {
    /// Create a provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RULES_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            management_endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            resource_type: config.resource_type.trim_matches('/').to_string(),
            api_version: config.api_version.clone(),
            client,
        })
    }

    /// Collection URL of a target's firewall rules (without query)
    fn rules_url(&self, target: &TargetDefinition) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}/{}/firewallRules",
            self.management_endpoint,
            urlencoding::encode(&target.subscription_id),
            urlencoding::encode(&target.resource_group),
            self.resource_type,
            urlencoding::encode(&target.server)
        )
    }

    /// Map a non-success response to an error
    async fn rejection(response: reqwest::Response, action: &str) -> Error {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        let message = match status.as_u16() {
            401 | 403 => format!(
                "{}: authentication failed or insufficient permissions - {}",
                action, error_text
            ),
            404 => format!("{}: resource not found - {}", action, error_text),
            429 => format!("{}: rate limit exceeded - {}", action, error_text),
            500..=599 => format!("{}: server error (transient) - {}", action, error_text),
            _ => format!("{}: {}", action, error_text),
        };

        Error::rejected(status.as_u16(), message)
    }
}

#[async_trait]
impl FirewallProvider for AzureFirewallProvider {
    /// List a target's firewall rules
    ///
    /// ```http
    /// GET /subscriptions/:sub/resourceGroups/:rg/providers/:type/:server/firewallRules?api-version=:v
    /// Authorization: Bearer <token>
    /// ```
    async fn list_entries(
        &self,
        target: &TargetDefinition,
        token: &AccessToken,
    ) -> Result<Vec<AllowListEntry>> {
        tracing::debug!("Listing firewall rules for {}", target.name);

        let response = self
            .client
            .get(self.rules_url(target))
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, "List firewall rules").await);
        }

        let list: RuleListResponse = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("Failed to parse rule list: {}", e)))?;

        if list.next_link.is_some() {
            tracing::warn!(
                "Firewall rule list for {} is paginated; only the first page is considered",
                target.name
            );
        }

        Ok(list.value.into_iter().map(AllowListEntry::from).collect())
    }

    /// Create a firewall rule under `name`
    ///
    /// ```http
    /// PUT /subscriptions/:sub/.../firewallRules/:name?api-version=:v
    /// Authorization: Bearer <token>
    /// {
    ///   "properties": { "startIpAddress": "1.2.3.4", "endIpAddress": "1.2.3.4" }
    /// }
    /// ```
    async fn create_entry(
        &self,
        target: &TargetDefinition,
        token: &AccessToken,
        name: &str,
        start_ip: IpAddr,
        end_ip: IpAddr,
    ) -> Result<CreateOutcome> {
        tracing::info!(
            "Creating firewall rule '{}' on {} for {} - {}",
            name,
            target.name,
            start_ip,
            end_ip
        );

        let url = format!("{}/{}", self.rules_url(target), urlencoding::encode(name));
        let payload = serde_json::json!({
            "properties": {
                "startIpAddress": start_ip.to_string(),
                "endIpAddress": end_ip.to_string(),
            }
        });

        let response = self
            .client
            .put(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token.secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 409 {
            tracing::debug!("Firewall rule name '{}' already taken on {}", name, target.name);
            return Ok(CreateOutcome::NameConflict);
        }
        if !status.is_success() {
            return Err(Self::rejection(response, "Create firewall rule").await);
        }

        let rule: RuleResource = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("Failed to parse created rule: {}", e)))?;

        Ok(CreateOutcome::Created(rule.into()))
    }

    fn provider_name(&self) -> &'static str {
        "azure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RULES_PATH: &str = "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Sql/servers/db-sql/firewallRules";

    fn target() -> TargetDefinition {
        TargetDefinition::new("db", "rg-prod", "db-sql", "tenant-1", "client-1", "s3cr3t", "sub-1")
    }

    fn token() -> AccessToken {
        AccessToken::new("tok", "Bearer", 3599)
    }

    fn provider_for(server: &MockServer) -> AzureFirewallProvider {
        let config = ProviderConfig {
            management_endpoint: server.uri(),
            ..ProviderConfig::default()
        };
        AzureFirewallProvider::new(&config).unwrap()
    }

    fn rule_json(name: &str, start: &str, end: &str) -> serde_json::Value {
        json!({
            "id": format!("{}/{}", RULES_PATH, name),
            "name": name,
            "type": "Microsoft.Sql/servers/firewallRules",
            "location": "West Europe",
            "properties": { "startIpAddress": start, "endIpAddress": end }
        })
    }

    #[test]
    fn test_provider_name() {
        let provider = AzureFirewallProvider::new(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.provider_name(), "azure");
    }

    #[test]
    fn test_rules_url() {
        let provider = AzureFirewallProvider::new(&ProviderConfig::default()).unwrap();
        assert_eq!(
            provider.rules_url(&target()),
            format!("https://management.azure.com{}", RULES_PATH)
        );
    }

    #[tokio::test]
    async fn test_list_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RULES_PATH))
            .and(query_param("api-version", "2021-11-01"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    rule_json("X", "203.0.113.5", "203.0.113.5"),
                    rule_json("office", "198.51.100.0", "198.51.100.255")
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = provider_for(&server)
            .list_entries(&target(), &token())
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "X");
        assert_eq!(entries[0].start_ip_address, "203.0.113.5");
        assert_eq!(entries[0].location.as_deref(), Some("West Europe"));
        assert_eq!(
            entries[1].entry_type.as_deref(),
            Some("Microsoft.Sql/servers/firewallRules")
        );
    }

    #[tokio::test]
    async fn test_list_empty_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RULES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .mount(&server)
            .await;

        let entries = provider_for(&server)
            .list_entries(&target(), &token())
            .await
            .unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_list_ignores_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RULES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [rule_json("X", "203.0.113.5", "203.0.113.5")],
                "nextLink": format!("{}{}?$skiptoken=abc", server.uri(), RULES_PATH)
            })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = provider_for(&server)
            .list_entries(&target(), &token())
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_list_forbidden_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": "AuthorizationFailed", "message": "no access" }
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .list_entries(&target(), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_list_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .list_entries(&target(), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
    }

    fn unreachable_provider() -> AzureFirewallProvider {
        let config = ProviderConfig {
            management_endpoint: "http://127.0.0.1:1".to_string(),
            ..ProviderConfig::default()
        };
        AzureFirewallProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_list_unreachable_is_transport_error() {
        let err = unreachable_provider()
            .list_entries(&target(), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_create_unreachable_is_transport_error() {
        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        let err = unreachable_provider()
            .create_entry(&target(), &token(), "Automatic IP", ip, ip)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_create_entry_encodes_name() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/Automatic%20IP%20-%201", RULES_PATH)))
            .and(query_param("api-version", "2021-11-01"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "properties": {
                    "startIpAddress": "203.0.113.5",
                    "endIpAddress": "203.0.113.5"
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(rule_json("Automatic IP - 1", "203.0.113.5", "203.0.113.5")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        let outcome = provider_for(&server)
            .create_entry(&target(), &token(), "Automatic IP - 1", ip, ip)
            .await
            .unwrap();

        match outcome {
            CreateOutcome::Created(entry) => {
                assert_eq!(entry.name, "Automatic IP - 1");
                assert!(entry.is_single_address(ip));
            }
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_conflict_is_name_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        let outcome = provider_for(&server)
            .create_entry(&target(), &token(), "Automatic IP", ip, ip)
            .await
            .unwrap();

        assert_eq!(outcome, CreateOutcome::NameConflict);
    }

    #[tokio::test]
    async fn test_create_server_error_is_single_shot() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        let err = provider_for(&server)
            .create_entry(&target(), &token(), "Automatic IP", ip, ip)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Rejected { status: 500, .. }));
    }
}
