//! Brightbox API models
//!
//! These mirror the JSON documents returned by the Brightbox 1.0 API for
//! the resources the load balancer controller manages: Cloud IPs, load
//! balancers, server groups and firewall policies/rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a member of one of the API's closed enums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    /// Name of the enum being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a valid {}", self.value, self.kind)
    }
}

impl std::error::Error for ParseEnumError {}

/// Declares a string-valued API enum with `FromStr`, `Display` and `as_str`.
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Wire representation of the value
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

api_enum! {
    /// Protocol spoken by a load balancer listener
    ListenerProtocol, "listener protocol" {
        /// Plain HTTP, headers parsed by the balancer
        Http => "http",
        /// HTTP with websocket upgrade support
        HttpWs => "http+ws",
        /// TLS-terminating HTTP
        Https => "https",
        /// TLS-terminating HTTP with websocket upgrade support
        HttpsWs => "https+ws",
        /// Raw TCP passthrough
        Tcp => "tcp",
    }
}

impl ListenerProtocol {
    /// Whether the listener terminates TLS
    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Https | Self::HttpsWs)
    }

    /// Whether the listener speaks unencrypted HTTP
    #[must_use]
    pub fn is_plain_http(&self) -> bool {
        matches!(self, Self::Http | Self::HttpWs)
    }

    /// The TLS-terminating counterpart of this protocol.
    ///
    /// Raw TCP listeners are never upgraded.
    #[must_use]
    pub fn with_tls(&self) -> Self {
        match self {
            Self::Http | Self::Https => Self::Https,
            Self::HttpWs | Self::HttpsWs => Self::HttpsWs,
            Self::Tcp => Self::Tcp,
        }
    }
}

api_enum! {
    /// How a load balancer distributes connections between nodes
    BalancingPolicy, "balancing policy" {
        /// Fewest open connections
        LeastConnections => "least-connections",
        /// Strict rotation
        RoundRobin => "round-robin",
        /// Sticky by client address
        SourceAddress => "source-address",
    }
}

api_enum! {
    /// PROXY protocol header sent to the backend
    ProxyProtocol, "proxy protocol" {
        /// Human readable v1 header
        V1 => "v1",
        /// Binary v2 header
        V2 => "v2",
        /// v2 header with TLS information
        V2Ssl => "v2-ssl",
        /// v2 header with TLS information and client certificate CN
        V2SslCn => "v2-ssl-cn",
    }
}

api_enum! {
    /// Load balancer health check type
    HealthcheckType, "health check protocol" {
        /// TCP connect check
        Tcp => "tcp",
        /// HTTP request check
        Http => "http",
    }
}

/// Lifecycle state of a load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerState {
    /// Still being built
    #[default]
    Creating,
    /// Serving traffic
    Active,
    /// Being torn down
    Deleting,
    /// Gone; the record lingers and its name may be reused
    Deleted,
    /// Build failed
    Failed,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

impl LoadBalancerState {
    /// A load balancer is alive while it is being built or is active
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Creating | Self::Active)
    }
}

/// Mapping state of a Cloud IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudIpState {
    /// Bound to a destination
    Mapped,
    /// Free
    #[default]
    Unmapped,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

/// ACME validation status reported for a certified domain
pub const ACME_DOMAIN_VALID: &str = "valid";

// The API reports "unset" numeric fields as 0 or null; both become None.
fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.filter(|v| *v != 0))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|v| !v.is_empty()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reference to a load balancer embedded in another resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedLoadBalancer {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// Reference to a server embedded in another resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedServer {
    pub id: String,
}

/// Reference to a server group embedded in another resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedServerGroup {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// Cloud IP model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudIp {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub public_ipv4: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub public_ipv6: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reverse_dns: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fqdn: String,
    #[serde(default)]
    pub status: CloudIpState,
    #[serde(default)]
    pub load_balancer: Option<NestedLoadBalancer>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CloudIp {
    /// Whether this Cloud IP is currently mapped onto the given load balancer
    #[must_use]
    pub fn is_mapped_to(&self, load_balancer_id: &str) -> bool {
        self.load_balancer
            .as_ref()
            .is_some_and(|lb| lb.id == load_balancer_id)
    }
}

/// Load balancer listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub protocol: ListenerProtocol,
    /// External port
    #[serde(rename = "in")]
    pub in_port: u16,
    /// Node port traffic is forwarded to
    #[serde(rename = "out")]
    pub out_port: u16,
    /// Idle timeout in milliseconds; None leaves the API default in place
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_protocol: Option<ProxyProtocol>,
}

/// Load balancer health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    #[serde(rename = "type")]
    pub check_type: HealthcheckType,
    pub port: u16,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub threshold_up: Option<u32>,
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub threshold_down: Option<u32>,
}

/// Per-domain ACME certificate status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcmeDomain {
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_message: String,
}

/// ACME certificate descriptor of a load balancer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acme {
    #[serde(default)]
    pub domains: Vec<AcmeDomain>,
}

/// Load balancer model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub status: LoadBalancerState,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    pub healthcheck: Healthcheck,
    #[serde(default)]
    pub policy: Option<BalancingPolicy>,
    #[serde(default)]
    pub nodes: Vec<NestedServer>,
    #[serde(default)]
    pub cloud_ips: Vec<CloudIp>,
    #[serde(default)]
    pub acme: Option<Acme>,
    #[serde(default)]
    pub https_redirect: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LoadBalancer {
    /// See [`LoadBalancerState::is_alive`]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }
}

/// Backend node entry in a load balancer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerNode {
    pub node: String,
}

/// Request body for creating or updating a load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerOptions {
    pub name: String,
    pub nodes: Vec<LoadBalancerNode>,
    pub listeners: Vec<Listener>,
    pub healthcheck: Healthcheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<BalancingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_redirect: Option<bool>,
}

/// Server group model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub servers: Vec<NestedServer>,
}

impl ServerGroup {
    /// Identifiers of the current members
    #[must_use]
    pub fn server_ids(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.id.clone()).collect()
    }
}

/// Firewall rule model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination_port: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Firewall policy model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPolicy {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub server_group: Option<NestedServerGroup>,
    #[serde(default)]
    pub rules: Vec<FirewallRule>,
}

/// Request body for creating a firewall policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPolicyOptions {
    pub name: String,
    pub server_group: String,
}

/// Request body for creating or updating a firewall rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRuleOptions {
    pub firewall_policy: String,
    pub protocol: String,
    pub source: String,
    pub destination_port: String,
    pub description: String,
}
