//! Load balancer reconciler
//!
//! Builds the desired load balancer from the service, compares it field by
//! field with the live one and only writes when something differs. Updates
//! are expensive on the remote side (they can trigger certificate reissue),
//! so an unchanged service must produce no update call at all.

use super::Reconciler;
use crate::annotations::{self, Annotations};
use crate::error::ControllerError;
use crate::reconcile_helpers::same_string_set;
use crate::service::{server_ids, ClusterNode, ServiceSpec};
use brightbox_client::{
    Acme, Healthcheck, HealthcheckType, Listener, ListenerProtocol, LoadBalancer, LoadBalancerNode,
    LoadBalancerOptions,
};
use tracing::{debug, info};

impl Reconciler {
    /// The live load balancer with this name. Deleted records keep their
    /// name for a while and are never matched.
    pub(crate) async fn find_load_balancer_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancer>, ControllerError> {
        let load_balancers = self.client.list_load_balancers().await?;
        Ok(load_balancers
            .into_iter()
            .find(|lb| lb.is_alive() && lb.name == name))
    }

    pub(crate) async fn find_load_balancer_by_id(
        &self,
        id: &str,
    ) -> Result<Option<LoadBalancer>, ControllerError> {
        match self.client.get_load_balancer(id).await {
            Ok(lb) => Ok(Some(lb)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Destroy the live load balancer with this name and return what was destroyed
    pub(crate) async fn ensure_load_balancer_deleted_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancer>, ControllerError> {
        let lb = self.find_load_balancer_by_name(name).await?;
        if let Some(lb) = &lb {
            info!("Destroying load balancer {}", lb.id);
            self.client.destroy_load_balancer(&lb.id).await?;
        }
        Ok(lb)
    }

    /// Open the perimeter, then create or update the load balancer as needed
    pub(crate) async fn ensure_load_balancer_from_service(
        &self,
        name: &str,
        domains: &[String],
        spec: &ServiceSpec,
        nodes: &[ClusterNode],
    ) -> Result<LoadBalancer, ControllerError> {
        let current = self.find_load_balancer_by_name(name).await?;
        self.ensure_firewall_open(name, spec, nodes).await?;
        let mut options = self.build_load_balancer_options(name, domains, spec, nodes);

        match current {
            None => {
                info!("Creating load balancer {}", name);
                Ok(self.client.create_load_balancer(&options).await?)
            }
            Some(lb) if load_balancer_needs_update(&lb, &options) => {
                // Sending no domains would leave stale certificate domains in place
                options.domains.get_or_insert_with(Vec::new);
                info!("Updating load balancer {}", lb.id);
                Ok(self.client.update_load_balancer(&lb.id, &options).await?)
            }
            Some(lb) => {
                debug!("No load balancer update required for {}, skipping", lb.id);
                Ok(lb)
            }
        }
    }

    /// Desired load balancer configuration for a service
    pub(crate) fn build_load_balancer_options(
        &self,
        name: &str,
        domains: &[String],
        spec: &ServiceSpec,
        nodes: &[ClusterNode],
    ) -> LoadBalancerOptions {
        let annotations = spec.annotations();
        let listeners = self.build_listeners(spec, annotations);
        let tls = listeners.iter().any(|l| l.protocol.is_tls());
        LoadBalancerOptions {
            name: name.to_string(),
            nodes: server_ids(nodes)
                .into_iter()
                .map(|node| LoadBalancerNode { node })
                .collect(),
            healthcheck: self.build_healthcheck(spec, annotations),
            listeners,
            policy: annotations.balancing_policy(),
            domains: tls.then(|| domains.to_vec()),
            https_redirect: Some(tls),
        }
    }

    fn build_listeners(&self, spec: &ServiceSpec, annotations: Annotations<'_>) -> Vec<Listener> {
        let protocol = annotations.listener_protocol(self.config.default_listener_protocol);
        let ssl_ports = annotations.ssl_ports();
        let timeout = annotations.number(annotations::LISTENER_IDLE_TIMEOUT);
        let proxy_protocol = annotations.proxy_protocol();

        spec.ports
            .iter()
            .map(|port| {
                let is_ssl_port =
                    port.port == self.config.standard_tls_port || ssl_ports.contains(port);
                Listener {
                    protocol: if is_ssl_port { protocol.with_tls() } else { protocol },
                    in_port: port.port,
                    out_port: port.node_port,
                    timeout,
                    proxy_protocol,
                }
            })
            .collect()
    }

    fn build_healthcheck(&self, spec: &ServiceSpec, annotations: Annotations<'_>) -> Healthcheck {
        // Per-node health checks are served by kube-proxy on their own port
        let per_node_port = spec
            .health_check_node_port
            .filter(|_| spec.needs_health_check);

        let check_type = annotations.healthcheck_type().unwrap_or_else(|| {
            let listener = annotations.listener_protocol(self.config.default_listener_protocol);
            if listener == ListenerProtocol::Tcp && per_node_port.is_none() {
                HealthcheckType::Tcp
            } else {
                HealthcheckType::Http
            }
        });

        let port = per_node_port
            .or_else(|| spec.ports.first().map(|p| p.node_port))
            .unwrap_or(self.config.default_healthcheck_port);

        let request = match check_type {
            HealthcheckType::Tcp => None,
            HealthcheckType::Http => Some(
                annotations
                    .health_check_request()
                    .unwrap_or(self.config.default_healthcheck_path.as_str())
                    .to_string(),
            ),
        };

        Healthcheck {
            check_type,
            port,
            request,
            interval: annotations.number(annotations::HC_INTERVAL),
            timeout: annotations.number(annotations::HC_TIMEOUT),
            threshold_up: annotations.number(annotations::HC_HEALTHY_THRESHOLD),
            threshold_down: annotations.number(annotations::HC_UNHEALTHY_THRESHOLD),
        }
    }
}

/// Whether the live load balancer differs from the desired options in any
/// field the reconciler owns
pub(crate) fn load_balancer_needs_update(lb: &LoadBalancer, options: &LoadBalancerOptions) -> bool {
    let changed = options.name != lb.name
        || healthcheck_needs_update(&options.healthcheck, &lb.healthcheck)
        || nodes_need_update(&options.nodes, lb)
        || listeners_need_update(&options.listeners, &lb.listeners)
        || domains_need_update(options.domains.as_deref(), lb.acme.as_ref());
    debug!("Load balancer {} update required: {}", lb.id, changed);
    changed
}

fn healthcheck_needs_update(new: &Healthcheck, old: &Healthcheck) -> bool {
    new.check_type != old.check_type
        || new.port != old.port
        || new.request.as_ref().is_some_and(|r| old.request.as_ref() != Some(r))
}

fn nodes_need_update(new: &[LoadBalancerNode], lb: &LoadBalancer) -> bool {
    new.len() != lb.nodes.len() || new.iter().zip(&lb.nodes).any(|(a, b)| a.node != b.id)
}

fn listeners_need_update(new: &[Listener], old: &[Listener]) -> bool {
    new.len() != old.len()
        || new.iter().zip(old).any(|(a, b)| {
            a.protocol != b.protocol
                || a.in_port != b.in_port
                || a.out_port != b.out_port
                || a.proxy_protocol != b.proxy_protocol
                || matches!((a.timeout, b.timeout), (Some(x), Some(y)) if x != y)
        })
}

fn domains_need_update(new: Option<&[String]>, acme: Option<&Acme>) -> bool {
    let current: Vec<String> = acme
        .map(|a| a.domains.iter().map(|d| d.identifier.clone()).collect())
        .unwrap_or_default();
    !same_string_set(new.unwrap_or_default(), &current)
}
