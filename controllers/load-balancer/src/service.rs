//! Service and node views consumed by the engine
//!
//! The engine works on [`ServiceSpec`] and [`ClusterNode`] rather than on the
//! Kubernetes objects directly; `from_service` and `From<&Node>` do the
//! conversion at the edge.

use crate::annotations::Annotations;
use crate::error::ValidationError;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Prefix of Brightbox provider IDs on Kubernetes nodes
pub const PROVIDER_PREFIX: &str = "brightbox://";

/// Transport protocol of a service port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportProtocol {
    Tcp,
    Udp,
    Sctp,
    Other(String),
}

impl TransportProtocol {
    /// Kubernetes spelling; an absent protocol means TCP
    fn from_k8s(value: Option<&str>) -> Self {
        match value {
            None | Some("TCP") => Self::Tcp,
            Some("UDP") => Self::Udp,
            Some("SCTP") => Self::Sctp,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("TCP"),
            Self::Udp => f.write_str("UDP"),
            Self::Sctp => f.write_str("SCTP"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Session affinity requested by a service
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionAffinity {
    #[default]
    None,
    ClientIp,
    Other(String),
}

impl fmt::Display for SessionAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::ClientIp => f.write_str("ClientIP"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// One exposed port of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    pub name: Option<String>,
    /// External port on the load balancer
    pub port: u16,
    /// Port on every node traffic is forwarded to
    pub node_port: u16,
    pub protocol: TransportProtocol,
}

impl ServicePort {
    /// TCP port with no name
    #[must_use]
    pub fn tcp(port: u16, node_port: u16) -> Self {
        Self {
            name: None,
            port,
            node_port,
            protocol: TransportProtocol::Tcp,
        }
    }
}

/// Desired state of one load-balanced service. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSpec {
    pub ports: Vec<ServicePort>,
    pub session_affinity: SessionAffinity,
    /// Deprecated explicit address (`spec.loadBalancerIP`)
    pub load_balancer_ip: Option<String>,
    pub annotations: BTreeMap<String, String>,
    /// Node port serving per-node health checks, if allocated
    pub health_check_node_port: Option<u16>,
    /// Traffic is only sent to nodes with local endpoints, so the balancer
    /// must use the per-node health check
    pub needs_health_check: bool,
}

impl ServiceSpec {
    /// Typed view of the annotation map
    #[must_use]
    pub fn annotations(&self) -> Annotations<'_> {
        Annotations::new(&self.annotations)
    }

    /// Build the engine's view of a Kubernetes service
    pub fn from_service(service: &Service) -> Result<Self, ValidationError> {
        let spec = service.spec.clone().unwrap_or_default();

        let ports = spec
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| {
                let name = p.name.clone().unwrap_or_default();
                let port = to_port(&name, p.port)?;
                let node_port = to_port(&name, p.node_port.unwrap_or_default())?;
                Ok(ServicePort {
                    name: p.name.filter(|n| !n.is_empty()),
                    port,
                    node_port,
                    protocol: TransportProtocol::from_k8s(p.protocol.as_deref()),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let session_affinity = match spec.session_affinity.as_deref() {
            None | Some("") | Some("None") => SessionAffinity::None,
            Some("ClientIP") => SessionAffinity::ClientIp,
            Some(other) => SessionAffinity::Other(other.to_string()),
        };

        let health_check_node_port = match spec.health_check_node_port {
            None | Some(0) => None,
            Some(value) => Some(to_port("healthCheckNodePort", value)?),
        };

        Ok(Self {
            ports,
            session_affinity,
            load_balancer_ip: spec.load_balancer_ip.filter(|ip| !ip.is_empty()),
            annotations: service.annotations().clone(),
            health_check_node_port,
            needs_health_check: spec.external_traffic_policy.as_deref() == Some("Local"),
        })
    }
}

fn to_port(name: &str, value: i32) -> Result<u16, ValidationError> {
    u16::try_from(value).map_err(|_| ValidationError::InvalidPort {
        name: name.to_string(),
        value,
    })
}

/// A backend node as far as the engine cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNode {
    pub name: String,
    pub provider_id: Option<String>,
}

impl ClusterNode {
    #[must_use]
    pub fn new(name: impl Into<String>, provider_id: Option<&str>) -> Self {
        Self {
            name: name.into(),
            provider_id: provider_id.map(str::to_string),
        }
    }

    /// Brightbox server id of the node, or None when it has no provider ID
    #[must_use]
    pub fn server_id(&self) -> Option<String> {
        self.provider_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| map_provider_id_to_server_id(id).to_string())
    }
}

impl From<&Node> for ClusterNode {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name_any(),
            provider_id: node.spec.as_ref().and_then(|s| s.provider_id.clone()),
        }
    }
}

/// Strip the `brightbox://` prefix from a provider ID; bare IDs pass through
#[must_use]
pub fn map_provider_id_to_server_id(provider_id: &str) -> &str {
    provider_id
        .strip_prefix(PROVIDER_PREFIX)
        .unwrap_or(provider_id)
}

/// Server ids of every node that has one, in input order
pub fn server_ids(nodes: &[ClusterNode]) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|node| {
            let id = node.server_id();
            if id.is_none() {
                warn!("node {:?} did not have providerID set", node.name);
            }
            id
        })
        .collect()
}

/// Remote resource name for a service: `name.namespace.cluster`.
///
/// An unnamed service is named after its UID.
#[must_use]
pub fn load_balancer_name(cluster_name: &str, service: &Service) -> String {
    let namespace = service
        .namespace()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| "default".to_string());
    let name = service
        .metadata
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_load_balancer_name(service));
    format!("{}.{}.{}", name, namespace, cluster_name)
}

/// `a` followed by the service UID without dashes, at most 32 characters
fn default_load_balancer_name(service: &Service) -> String {
    let uid = service.uid().unwrap_or_default().replace('-', "");
    let mut name = format!("a{}", uid);
    name.truncate(32);
    name
}
