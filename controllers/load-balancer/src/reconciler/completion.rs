//! Completion checks
//!
//! Run against a fresh read after all writes. They never wait; an
//! incomplete result is returned and the caller retries on its own schedule.

use crate::error::ControllerError;
use brightbox_client::{Acme, LoadBalancer, ACME_DOMAIN_VALID};

/// Success once the load balancer is alive, holds exactly the resolved Cloud
/// IP and every certificate domain is validated
pub fn error_if_not_complete(
    lb: Option<&LoadBalancer>,
    cloud_ip_id: &str,
    name: &str,
) -> Result<(), ControllerError> {
    let Some(lb) = lb else {
        return Err(ControllerError::LoadBalancerMissing(name.to_string()));
    };
    if !lb.is_alive() {
        return Err(ControllerError::StillBuilding(lb.id.clone()));
    }
    if lb.cloud_ips.len() > 1 {
        return Err(ControllerError::DeposedNotUnmapped(lb.id.clone()));
    }
    if lb.cloud_ips.first().is_none_or(|cip| cip.id != cloud_ip_id) {
        return Err(ControllerError::MappingIncomplete {
            cloud_ip: cloud_ip_id.to_string(),
            load_balancer: lb.id.clone(),
        });
    }
    error_if_acme_not_complete(lb.acme.as_ref())
}

/// Every ACME domain must have reached the valid state
pub fn error_if_acme_not_complete(acme: Option<&Acme>) -> Result<(), ControllerError> {
    let pending = acme
        .into_iter()
        .flat_map(|a| &a.domains)
        .find(|d| d.status != ACME_DOMAIN_VALID);
    match pending {
        Some(domain) => Err(ControllerError::DomainUnvalidated {
            domain: domain.identifier.clone(),
            status: domain.status.clone(),
            message: domain.last_message.clone(),
        }),
        None => Ok(()),
    }
}

/// Success when the load balancer is gone, or is no longer alive and has
/// nothing mapped to it
pub fn error_if_not_erased(lb: Option<&LoadBalancer>) -> Result<(), ControllerError> {
    match lb {
        None => Ok(()),
        Some(lb) if !lb.cloud_ips.is_empty() => {
            Err(ControllerError::CloudIpsStillMapped(lb.id.clone()))
        }
        Some(lb) if !lb.is_alive() => Ok(()),
        Some(lb) => Err(ControllerError::NotErased(lb.id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brightbox_client::mock::helpers;
    use brightbox_client::LoadBalancerState;

    fn mapped_lb(cips: &[u64]) -> LoadBalancer {
        let mut lb = helpers::load_balancer(100, "web.default.k8s");
        lb.cloud_ips = cips
            .iter()
            .map(|n| helpers::mapped_cloud_ip(*n, "web.default.k8s", &lb))
            .collect();
        lb
    }

    #[test]
    fn test_complete() {
        let lb = mapped_lb(&[101]);
        assert!(error_if_not_complete(Some(&lb), "cip-00101", "web").is_ok());
    }

    #[test]
    fn test_missing_and_building() {
        assert!(matches!(
            error_if_not_complete(None, "cip-00101", "web"),
            Err(ControllerError::LoadBalancerMissing(name)) if name == "web"
        ));

        let mut lb = mapped_lb(&[101]);
        lb.status = LoadBalancerState::Failed;
        assert!(matches!(
            error_if_not_complete(Some(&lb), "cip-00101", "web"),
            Err(ControllerError::StillBuilding(_))
        ));
    }

    #[test]
    fn test_mapping_states() {
        let lb = mapped_lb(&[101, 102]);
        assert!(matches!(
            error_if_not_complete(Some(&lb), "cip-00101", "web"),
            Err(ControllerError::DeposedNotUnmapped(_))
        ));

        let lb = mapped_lb(&[]);
        assert!(matches!(
            error_if_not_complete(Some(&lb), "cip-00101", "web"),
            Err(ControllerError::MappingIncomplete { .. })
        ));

        let lb = mapped_lb(&[102]);
        let err = error_if_not_complete(Some(&lb), "cip-00101", "web").unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_unvalidated_domain() {
        let mut lb = mapped_lb(&[101]);
        lb.acme = helpers::acme(&["example.com".to_string()], "pending");
        assert!(matches!(
            error_if_not_complete(Some(&lb), "cip-00101", "web"),
            Err(ControllerError::DomainUnvalidated { domain, status, .. })
                if domain == "example.com" && status == "pending"
        ));
    }

    #[test]
    fn test_erased() {
        assert!(error_if_not_erased(None).is_ok());

        let mut lb = mapped_lb(&[]);
        lb.status = LoadBalancerState::Deleted;
        assert!(error_if_not_erased(Some(&lb)).is_ok());

        let mut lb = mapped_lb(&[101]);
        lb.status = LoadBalancerState::Deleted;
        assert!(matches!(
            error_if_not_erased(Some(&lb)),
            Err(ControllerError::CloudIpsStillMapped(_))
        ));

        let lb = mapped_lb(&[]);
        assert!(matches!(
            error_if_not_erased(Some(&lb)),
            Err(ControllerError::NotErased(_))
        ));
    }
}
