//! Cloud IP resolution
//!
//! First match wins: the allocation annotation, then the deprecated
//! `spec.loadBalancerIP`, then a Cloud IP named after the service or mapped
//! to its load balancer. Failing all three a new Cloud IP is allocated.

use super::Reconciler;
use crate::annotations;
use crate::error::ControllerError;
use crate::service::ServiceSpec;
use brightbox_client::CloudIp;
use std::net::IpAddr;
use tracing::{debug, info, warn};

impl Reconciler {
    /// Find or allocate the Cloud IP for the service
    pub(crate) async fn ensure_allocated_cloud_ip(
        &self,
        name: &str,
        spec: &ServiceSpec,
    ) -> Result<CloudIp, ControllerError> {
        debug!("Resolving Cloud IP for {}", name);
        if let Some(id) = spec.annotations().cloud_ip_allocation() {
            return match self.client.get_cloud_ip(id).await {
                Ok(cip) => Ok(cip),
                Err(e) if e.is_not_found() => Err(ControllerError::AddressNotFound(id.to_string())),
                Err(e) => Err(e.into()),
            };
        }
        if let Some(ip) = spec.load_balancer_ip.as_deref() {
            return self.lookup_cloud_ip_by_ip(ip).await;
        }
        self.lookup_cloud_ip_by_name(name).await
    }

    async fn lookup_cloud_ip_by_ip(&self, ip: &str) -> Result<CloudIp, ControllerError> {
        let Ok(wanted) = ip.parse::<IpAddr>() else {
            return Err(ControllerError::AddressNotFound(ip.to_string()));
        };
        let cip = self
            .client
            .list_cloud_ips()
            .await?
            .into_iter()
            .find(|cip| has_address(cip, wanted))
            .ok_or_else(|| ControllerError::AddressNotFound(ip.to_string()))?;
        warn!(
            "spec.loadBalancerIP is deprecated. Remove the entry and add the annotation: {}={}",
            annotations::CLOUDIP_ALLOCATIONS,
            cip.id
        );
        Ok(cip)
    }

    async fn lookup_cloud_ip_by_name(&self, name: &str) -> Result<CloudIp, ControllerError> {
        let existing = self.client.list_cloud_ips().await?.into_iter().find(|cip| {
            cip.name == name || cip.load_balancer.as_ref().is_some_and(|lb| lb.name == name)
        });
        match existing {
            Some(cip) => {
                debug!("Found Cloud IP {} for {}", cip.id, name);
                Ok(cip)
            }
            None => {
                info!("Allocating Cloud IP for {}", name);
                Ok(self.client.create_cloud_ip(name).await?)
            }
        }
    }
}

fn has_address(cip: &CloudIp, wanted: IpAddr) -> bool {
    [&cip.public_ipv4, &cip.public_ipv6]
        .into_iter()
        .any(|address| address.parse::<IpAddr>().is_ok_and(|a| a == wanted))
}
