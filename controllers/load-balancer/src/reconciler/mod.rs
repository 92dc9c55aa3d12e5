//! Reconciliation logic for Brightbox load balancers.
//!
//! This module is organized by the remote resources each step converges:
//! - `cloud_ip`: finding or allocating the service's Cloud IP
//! - `domains`: DNS verification of certificate domains
//! - `firewall`: server group membership and the firewall perimeter
//! - `load_balancer`: desired configuration, diff and create/update
//! - `mapping`: mapping, deposing and destroying Cloud IPs
//! - `completion`: convergence checks on the final refetch
//!
//! Every step re-reads remote state, so an interrupted pass is resumed by
//! simply calling the entry point again.

pub mod cloud_ip;
pub mod completion;
pub mod domains;
pub mod firewall;
pub mod load_balancer;
pub mod mapping;

#[cfg(test)]
mod mapping_test;
#[cfg(test)]
mod reconciler_test;

use crate::config::EngineConfig;
use crate::error::ControllerError;
use crate::service::{ClusterNode, ServiceSpec};
use crate::status::to_load_balancer_status;
use crate::validation::validate_service_spec;
use brightbox_client::BrightboxClientTrait;
use domains::{DomainResolver, SystemResolver};
use k8s_openapi::api::core::v1::LoadBalancerStatus;
use tracing::{debug, info};

/// Reconciles the Brightbox resources behind load-balanced services.
pub struct Reconciler {
    pub(crate) client: Box<dyn BrightboxClientTrait + Send + Sync>,
    pub(crate) resolver: Box<dyn DomainResolver>,
    pub(crate) config: EngineConfig,
}

impl Reconciler {
    /// Engine using the system DNS resolver
    pub fn new(
        client: Box<dyn BrightboxClientTrait + Send + Sync>,
        config: EngineConfig,
    ) -> Result<Self, ControllerError> {
        Self::with_resolver(client, Box::new(SystemResolver), config)
    }

    /// Engine with a caller-supplied DNS resolver
    pub fn with_resolver(
        client: Box<dyn BrightboxClientTrait + Send + Sync>,
        resolver: Box<dyn DomainResolver>,
        config: EngineConfig,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        Ok(Self {
            client,
            resolver,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Converge the Cloud IP, perimeter and load balancer for a service and
    /// return the ingress to publish.
    ///
    /// An incomplete-convergence error means the remote side is still
    /// catching up; call again on the next resync.
    pub async fn ensure_load_balancer(
        &self,
        name: &str,
        spec: &ServiceSpec,
        nodes: &[ClusterNode],
    ) -> Result<LoadBalancerStatus, ControllerError> {
        info!("Ensuring load balancer {} with {} ports", name, spec.ports.len());
        validate_service_spec(spec, &self.config)?;

        let cip = self.ensure_allocated_cloud_ip(name, spec).await?;
        let domains = self.verify_domains(spec.annotations(), &cip).await?;
        let lb = self
            .ensure_load_balancer_from_service(name, &domains, spec, nodes)
            .await?;
        self.ensure_mapped_cloud_ip(&lb, &cip).await?;
        self.ensure_old_cloud_ips_deposed(&lb, &cip.id).await?;
        self.ensure_cloud_ips_deleted(Some(&cip.id), name).await?;

        let lb = self.find_load_balancer_by_id(&lb.id).await?;
        completion::error_if_not_complete(lb.as_ref(), &cip.id, name)?;
        info!("Load balancer {} converged", name);
        Ok(to_load_balancer_status(lb.as_ref()))
    }

    /// Same as [`Reconciler::ensure_load_balancer`], discarding the status
    pub async fn update_load_balancer(
        &self,
        name: &str,
        spec: &ServiceSpec,
        nodes: &[ClusterNode],
    ) -> Result<(), ControllerError> {
        debug!("UpdateLoadBalancer called for {}, delegating", name);
        self.ensure_load_balancer(name, spec, nodes).await.map(|_| ())
    }

    /// Tear down everything created for a service.
    ///
    /// Perimeter first, then the load balancer, then every Cloud IP named
    /// after the service. Succeeds without writes when nothing exists.
    pub async fn ensure_load_balancer_deleted(
        &self,
        name: &str,
        spec: &ServiceSpec,
    ) -> Result<(), ControllerError> {
        info!(
            "Ensuring load balancer {} is deleted (loadBalancerIP {:?})",
            name, spec.load_balancer_ip
        );
        self.ensure_firewall_closed(name).await?;
        self.ensure_server_group_deleted(name).await?;
        let lb = self.ensure_load_balancer_deleted_by_name(name).await?;
        self.ensure_cloud_ips_deleted(None, name).await?;

        let lb = match lb {
            Some(lb) => self.find_load_balancer_by_id(&lb.id).await?,
            None => None,
        };
        completion::error_if_not_erased(lb.as_ref())
    }

    /// Current status of the service's load balancer, or None when there is
    /// no live one.
    pub async fn get_load_balancer(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancerStatus>, ControllerError> {
        debug!("Getting load balancer {}", name);
        let lb = self.find_load_balancer_by_name(name).await?;
        Ok(lb.as_ref().map(|lb| to_load_balancer_status(Some(lb))))
    }
}
