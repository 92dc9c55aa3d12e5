//! Controller-specific error types.
//!
//! Validation failures, remote API failures, consistency failures and
//! incomplete-convergence conditions each get their own variants so the host
//! can decide what to retry.

use brightbox_client::{BrightboxError, ListenerProtocol};
use thiserror::Error;

/// Malformed or unsupported service specification.
///
/// Always reported before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported load balancer affinity: {0}")]
    UnsupportedAffinity(String),

    #[error("requested load balancer with no ports")]
    NoPorts,

    #[error("{0} nodeports are not supported")]
    UnsupportedProtocol(String),

    #[error("SSL support requires a Port definition for {0}")]
    TlsPortMissing(u16),

    #[error("Remove obsolete field: spec.loadBalancerIP")]
    ConflictingAddressSpec,

    #[error("Invalid annotation {annotation} value {value:?}: {reason}")]
    InvalidAnnotation {
        annotation: String,
        value: String,
        reason: String,
    },

    #[error("SSL needs a list of domains to certify. Add the {0:?} annotation")]
    MissingDomains(String),

    #[error("{annotation} is not supported with the {protocol} protocol")]
    TlsNotSupportedWithProtocol {
        annotation: String,
        protocol: ListenerProtocol,
    },

    #[error("port {name} has out of range value {value}")]
    InvalidPort { name: String, value: i32 },
}

/// Errors that can occur in the load balancer controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Service specification rejected
    #[error("Invalid service: {0}")]
    Validation(#[from] ValidationError),

    /// Brightbox API error
    #[error("Brightbox error: {0}")]
    Cloud(#[from] BrightboxError),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested Cloud IP does not exist
    #[error("Could not find allocated Cloud IP {0:?}")]
    AddressNotFound(String),

    /// Cloud IP carries no usable public address
    #[error("Cloud IP {0:?} failed to parse IP addresses")]
    InvalidAddress(String),

    /// A domain does not point at the load balancer's address
    #[error("Failed to resolve {domain:?} to load balancer address ({ipv4},{ipv6}): {detail}")]
    DomainNotResolved {
        domain: String,
        ipv4: String,
        ipv6: String,
        detail: String,
    },

    /// Cloud IP is mapped to something other than this load balancer
    #[error("Unexplained mapping of Cloud IP {cloud_ip:?} to {target:?}")]
    UnexplainedMapping { cloud_ip: String, target: String },

    #[error("Load Balancer for {0:?} is missing")]
    LoadBalancerMissing(String),

    #[error("Load Balancer {0:?} still building")]
    StillBuilding(String),

    #[error("Unmapping of deposed Cloud IPs to {0:?} not complete")]
    DeposedNotUnmapped(String),

    #[error("Mapping of Cloud IP {cloud_ip:?} to {load_balancer:?} not complete")]
    MappingIncomplete {
        cloud_ip: String,
        load_balancer: String,
    },

    #[error("Domain {domain:?} has not yet been validated for SSL use ({status:?}:{message:?})")]
    DomainUnvalidated {
        domain: String,
        status: String,
        message: String,
    },

    #[error("Cloud IPs still mapped to load balancer {0:?}")]
    CloudIpsStillMapped(String),

    #[error("Unknown reason why {0:?} has not deleted")]
    NotErased(String),
}

impl ControllerError {
    /// True for errors raised before any remote call
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True when remote state has not converged yet and the caller should
    /// try again on its next resync
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            Self::LoadBalancerMissing(_)
                | Self::StillBuilding(_)
                | Self::DeposedNotUnmapped(_)
                | Self::MappingIncomplete { .. }
                | Self::DomainUnvalidated { .. }
                | Self::CloudIpsStillMapped(_)
                | Self::NotErased(_)
        )
    }
}
