//! Domain resolution verification
//!
//! A certificate is only requested for domains that already resolve to the
//! load balancer's Cloud IP. Issuance for anything else fails upstream and
//! burns the ACME rate limit.

use super::Reconciler;
use crate::annotations::Annotations;
use crate::error::ControllerError;
use async_trait::async_trait;
use brightbox_client::CloudIp;
use std::io;
use std::net::IpAddr;
use tracing::debug;

/// DNS lookups used by domain verification
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// Every address the domain resolves to
    async fn lookup(&self, domain: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system's lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl DomainResolver for SystemResolver {
    async fn lookup(&self, domain: &str) -> io::Result<Vec<IpAddr>> {
        let addresses = tokio::net::lookup_host((domain, 0)).await?;
        Ok(addresses.map(|a| a.ip()).collect())
    }
}

/// Sorted, deduplicated domains: the extra annotation domains plus the
/// Cloud IP's own FQDN and reverse DNS name
pub(crate) fn candidate_domains(annotations: Annotations<'_>, cip: &CloudIp) -> Vec<String> {
    let mut domains = annotations.extra_domains();
    domains.extend([cip.fqdn.clone(), cip.reverse_dns.clone()]);
    domains.retain(|d| !d.is_empty());
    domains.sort();
    domains.dedup();
    domains
}

/// Public addresses of a Cloud IP; at least one must parse
pub(crate) fn cloud_ip_addresses(cip: &CloudIp) -> Result<Vec<IpAddr>, ControllerError> {
    let addresses: Vec<IpAddr> = [&cip.public_ipv4, &cip.public_ipv6]
        .into_iter()
        .filter_map(|a| a.parse().ok())
        .collect();
    if addresses.is_empty() {
        return Err(ControllerError::InvalidAddress(cip.id.clone()));
    }
    Ok(addresses)
}

impl Reconciler {
    /// Check every candidate domain resolves to the Cloud IP and return them
    pub(crate) async fn verify_domains(
        &self,
        annotations: Annotations<'_>,
        cip: &CloudIp,
    ) -> Result<Vec<String>, ControllerError> {
        let domains = candidate_domains(annotations, cip);
        let addresses = cloud_ip_addresses(cip)?;

        for domain in &domains {
            let unresolved = |detail: String| ControllerError::DomainNotResolved {
                domain: domain.clone(),
                ipv4: cip.public_ipv4.clone(),
                ipv6: cip.public_ipv6.clone(),
                detail,
            };
            let resolved = self
                .resolver
                .lookup(domain)
                .await
                .map_err(|e| unresolved(e.to_string()))?;
            if !resolved.iter().any(|ip| addresses.contains(ip)) {
                return Err(unresolved(format!("resolves to {:?}", resolved)));
            }
            debug!("Domain {} resolves to Cloud IP {}", domain, cip.id);
        }
        Ok(domains)
    }
}
