//! Service annotations understood by the load balancer controller
//!
//! Keys live under `service.beta.kubernetes.io/brightbox-load-balancer-*`,
//! except the health check interval which keeps its historical `aws-` key.
//! [`Annotations`] gives typed, lenient access for building the desired load
//! balancer; strict checking happens in [`crate::validation`].

use crate::service::ServicePort;
use brightbox_client::{BalancingPolicy, HealthcheckType, ListenerProtocol, ProxyProtocol};
use std::collections::{BTreeMap, BTreeSet};
use std::num::ParseIntError;
use tracing::debug;

/// Balancing policy: `least-connections`, `round-robin` or `source-address`
pub const POLICY: &str = "service.beta.kubernetes.io/brightbox-load-balancer-policy";
/// Protocol spoken by the listeners: `http` (default), `http+ws`, `https`, `https+ws` or `tcp`
pub const LISTENER_PROTOCOL: &str = "service.beta.kubernetes.io/brightbox-load-balancer-listener-protocol";
/// Listener idle timeout in milliseconds
pub const LISTENER_IDLE_TIMEOUT: &str = "service.beta.kubernetes.io/brightbox-load-balancer-listener-idle-timeout";
/// PROXY protocol sent to the backends
pub const LISTENER_PROXY_PROTOCOL: &str = "service.beta.kubernetes.io/brightbox-load-balancer-listener-proxy-protocol";
/// Comma-separated ports (numbers or names) that get TLS listeners
pub const SSL_PORTS: &str = "service.beta.kubernetes.io/brightbox-load-balancer-ssl-ports";
/// Comma-separated extra domains for the Let's Encrypt certificate
pub const SSL_DOMAINS: &str = "service.beta.kubernetes.io/brightbox-load-balancer-ssl-domains";
/// Cloud IP to map onto the load balancer, `cip-xxxxx`
pub const CLOUDIP_ALLOCATIONS: &str = "service.beta.kubernetes.io/brightbox-load-balancer-cloudip-allocations";
/// Consecutive passing checks before a node is marked healthy
pub const HC_HEALTHY_THRESHOLD: &str = "service.beta.kubernetes.io/brightbox-load-balancer-healthcheck-healthy-threshold";
/// Consecutive failing checks before a node is marked unhealthy
pub const HC_UNHEALTHY_THRESHOLD: &str = "service.beta.kubernetes.io/brightbox-load-balancer-healthcheck-unhealthy-threshold";
/// Health check type: `tcp` or `http`
pub const HC_PROTOCOL: &str = "service.beta.kubernetes.io/brightbox-load-balancer-healthcheck-protocol";
/// Request path of HTTP health checks
pub const HC_REQUEST: &str = "service.beta.kubernetes.io/brightbox-load-balancer-healthcheck-request";
/// Health check timeout in milliseconds
pub const HC_TIMEOUT: &str = "service.beta.kubernetes.io/brightbox-load-balancer-healthcheck-timeout";
/// Milliseconds between health checks
pub const HC_INTERVAL: &str = "service.beta.kubernetes.io/aws-load-balancer-healthcheck-interval";

/// Annotations holding unsigned 32-bit numbers
pub const NUMERIC: [&str; 5] = [
    LISTENER_IDLE_TIMEOUT,
    HC_HEALTHY_THRESHOLD,
    HC_UNHEALTHY_THRESHOLD,
    HC_TIMEOUT,
    HC_INTERVAL,
];

/// Parse an unsigned 32-bit annotation value
pub fn parse_u32(value: &str) -> Result<u32, ParseIntError> {
    value.parse::<u32>()
}

/// Ports selected by the SSL ports annotation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet {
    numbers: BTreeSet<u16>,
    names: BTreeSet<String>,
}

impl PortSet {
    /// Split a comma-separated list into port numbers and port names
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut set = Self::default();
        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.parse::<u16>() {
                Ok(number) => {
                    set.numbers.insert(number);
                }
                Err(_) => {
                    set.names.insert(item.to_string());
                }
            }
        }
        set
    }

    /// Whether the port is selected by number or by name
    #[must_use]
    pub fn contains(&self, port: &ServicePort) -> bool {
        self.numbers.contains(&port.port)
            || port.name.as_ref().is_some_and(|n| self.names.contains(n))
    }
}

/// Typed read-only view over a service's annotation map
#[derive(Debug, Clone, Copy)]
pub struct Annotations<'a> {
    map: &'a BTreeMap<String, String>,
}

impl<'a> Annotations<'a> {
    #[must_use]
    pub fn new(map: &'a BTreeMap<String, String>) -> Self {
        Self { map }
    }

    /// Raw value of an annotation
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).map(String::as_str)
    }

    /// Whether an annotation is present, whatever its value
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Listener protocol annotation, or `default` when absent or invalid
    #[must_use]
    pub fn listener_protocol(&self, default: ListenerProtocol) -> ListenerProtocol {
        self.get(LISTENER_PROTOCOL)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    #[must_use]
    pub fn proxy_protocol(&self) -> Option<ProxyProtocol> {
        self.get(LISTENER_PROXY_PROTOCOL).and_then(|v| v.parse().ok())
    }

    #[must_use]
    pub fn healthcheck_type(&self) -> Option<HealthcheckType> {
        self.get(HC_PROTOCOL).and_then(|v| v.parse().ok())
    }

    /// Balancing policy annotation; an invalid value is logged and ignored
    #[must_use]
    pub fn balancing_policy(&self) -> Option<BalancingPolicy> {
        let value = self.get(POLICY)?;
        match value.parse() {
            Ok(policy) => Some(policy),
            Err(e) => {
                debug!("Unexpected balancing policy: {}", e);
                None
            }
        }
    }

    /// Numeric annotation; None when absent, unparsable or zero
    #[must_use]
    pub fn number(&self, key: &str) -> Option<u32> {
        self.get(key)
            .and_then(|v| parse_u32(v).ok())
            .filter(|v| *v != 0)
    }

    /// Ports that should get TLS listeners besides the standard TLS port
    #[must_use]
    pub fn ssl_ports(&self) -> PortSet {
        self.get(SSL_PORTS).map(PortSet::parse).unwrap_or_default()
    }

    /// Extra certificate domains, empty entries removed
    #[must_use]
    pub fn extra_domains(&self) -> Vec<String> {
        self.get(SSL_DOMAINS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn health_check_request(&self) -> Option<&'a str> {
        self.get(HC_REQUEST)
    }

    #[must_use]
    pub fn cloud_ip_allocation(&self) -> Option<&'a str> {
        self.get(CLOUDIP_ALLOCATIONS)
    }

    /// Iterate over every annotation in key order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
