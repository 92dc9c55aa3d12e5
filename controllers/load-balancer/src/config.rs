//! Engine configuration
//!
//! Every default the reconciler relies on lives in [`EngineConfig`], owned by
//! each [`crate::Reconciler`] instance, so several differently configured
//! engines can run side by side.

use crate::backoff::RetryPolicy;
use crate::error::ControllerError;
use brightbox_client::ListenerProtocol;
use std::env;
use std::net::IpAddr;
use tracing::info;

const CLUSTER_NAME_ENV_VAR: &str = "CLUSTER_NAME";
const FIREWALL_SOURCE_CIDR_ENV_VAR: &str = "LB_FIREWALL_SOURCE_CIDR";

/// Settings shared by every reconciliation the engine performs
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Suffix of every remote resource name
    pub cluster_name: String,
    /// Source allowed through the perimeter firewall rule
    pub firewall_source_cidr: String,
    /// Protocol of the perimeter firewall rule
    pub firewall_protocol: String,
    /// Port that always gets a TLS-terminating listener
    pub standard_tls_port: u16,
    /// Health check port when the service has no ports
    pub default_healthcheck_port: u16,
    /// Request path for HTTP health checks without an annotation
    pub default_healthcheck_path: String,
    /// Listener protocol without an annotation
    pub default_listener_protocol: ListenerProtocol,
    /// Backoff for destroying superseded Cloud IPs
    pub cloud_ip_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_name: "kubernetes".to_string(),
            firewall_source_cidr: "10.0.0.0/8".to_string(),
            firewall_protocol: "tcp".to_string(),
            standard_tls_port: 443,
            default_healthcheck_port: 80,
            default_healthcheck_path: "/healthz".to_string(),
            default_listener_protocol: ListenerProtocol::Http,
            cloud_ip_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, keeping defaults for unset ones
    pub fn from_env() -> Result<Self, ControllerError> {
        let mut config = Self::default();
        if let Ok(cluster) = env::var(CLUSTER_NAME_ENV_VAR) {
            config.cluster_name = cluster;
        }
        if let Ok(cidr) = env::var(FIREWALL_SOURCE_CIDR_ENV_VAR) {
            config.firewall_source_cidr = cidr;
        }
        config.validate()?;

        info!("Configuration:");
        info!("  Cluster name: {}", config.cluster_name);
        info!("  Firewall source: {}", config.firewall_source_cidr);
        Ok(config)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.cluster_name.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "cluster name must not be empty".to_string(),
            ));
        }
        if !is_valid_cidr(&self.firewall_source_cidr) {
            return Err(ControllerError::InvalidConfig(format!(
                "firewall source {:?} is not a CIDR block",
                self.firewall_source_cidr
            )));
        }
        Ok(())
    }
}

fn is_valid_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    let (Ok(address), Ok(prefix)) = (address.parse::<IpAddr>(), prefix.parse::<u8>()) else {
        return false;
    };
    match address {
        IpAddr::V4(_) => prefix <= 32,
        IpAddr::V6(_) => prefix <= 128,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.firewall_source_cidr, "10.0.0.0/8");
        assert_eq!(config.standard_tls_port, 443);
        assert_eq!(config.cloud_ip_retry.steps, 5);
    }

    #[test]
    fn test_cidr_validation() {
        assert!(is_valid_cidr("10.0.0.0/8"));
        assert!(is_valid_cidr("2a02:1348:140::/42"));
        assert!(!is_valid_cidr("10.0.0.0"));
        assert!(!is_valid_cidr("10.0.0.0/33"));
        assert!(!is_valid_cidr("nonsense/8"));
    }

    #[test]
    fn test_empty_cluster_name_rejected() {
        let config = EngineConfig {
            cluster_name: String::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidConfig(_))
        ));
    }
}
