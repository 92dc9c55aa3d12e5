//! Projection of a load balancer into the Kubernetes service status

use brightbox_client::LoadBalancer;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus};

/// Ingress hostnames for every mapped Cloud IP: reverse DNS first, then FQDN.
///
/// Raw addresses are never published; clients would cache them before DNS
/// has caught up. An absent load balancer gives an empty status.
#[must_use]
pub fn to_load_balancer_status(load_balancer: Option<&LoadBalancer>) -> LoadBalancerStatus {
    let Some(lb) = load_balancer else {
        return LoadBalancerStatus::default();
    };
    if lb.cloud_ips.is_empty() {
        return LoadBalancerStatus::default();
    }

    let ingress = lb
        .cloud_ips
        .iter()
        .flat_map(|cip| [&cip.reverse_dns, &cip.fqdn])
        .filter(|hostname| !hostname.is_empty())
        .map(|hostname| LoadBalancerIngress {
            hostname: Some(hostname.clone()),
            ..Default::default()
        })
        .collect();

    LoadBalancerStatus {
        ingress: Some(ingress),
    }
}
