//! Firewall perimeter reconciler
//!
//! Each load balancer gets its own server group, firewall policy and single
//! firewall rule, all named after the service. The rule opens the node
//! ports (and the health check node port) to the load balancer source range.

use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::sync_lists;
use crate::service::{server_ids, ClusterNode, ServiceSpec};
use brightbox_client::{FirewallPolicy, FirewallPolicyOptions, FirewallRule, FirewallRuleOptions, ServerGroup};
use tracing::{debug, info};

/// Comma-separated node ports, health check node port last
pub(crate) fn port_list(spec: &ServiceSpec) -> String {
    spec.ports
        .iter()
        .map(|p| p.node_port)
        .chain(spec.health_check_node_port)
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether any field of the existing rule differs from the desired one
pub(crate) fn firewall_rule_needs_update(old: &FirewallRule, new: &FirewallRuleOptions) -> bool {
    old.protocol.as_deref() != Some(new.protocol.as_str())
        || old.source.as_deref() != Some(new.source.as_str())
        || old.destination_port.as_deref() != Some(new.destination_port.as_str())
        || old.description.as_deref() != Some(new.description.as_str())
}

impl Reconciler {
    /// Make sure the perimeter for a service exists and matches its nodes and ports
    pub(crate) async fn ensure_firewall_open(
        &self,
        name: &str,
        spec: &ServiceSpec,
        nodes: &[ClusterNode],
    ) -> Result<(), ControllerError> {
        debug!("Opening firewall for {}", name);
        if spec.ports.is_empty() {
            debug!("no ports to open");
            return Ok(());
        }
        let group = self.ensure_server_group(name, nodes).await?;
        let policy = self.ensure_firewall_policy(&group).await?;
        self.ensure_firewall_rule(spec, &policy).await
    }

    pub(crate) async fn find_server_group(&self, name: &str) -> Result<Option<ServerGroup>, ControllerError> {
        let groups = self.client.list_server_groups().await?;
        Ok(groups.into_iter().find(|g| g.name == name))
    }

    pub(crate) async fn find_firewall_policy(&self, name: &str) -> Result<Option<FirewallPolicy>, ControllerError> {
        let policies = self.client.list_firewall_policies().await?;
        Ok(policies.into_iter().find(|p| p.name == name))
    }

    async fn ensure_server_group(
        &self,
        name: &str,
        nodes: &[ClusterNode],
    ) -> Result<ServerGroup, ControllerError> {
        let group = match self.find_server_group(name).await? {
            Some(group) => group,
            None => {
                info!("Creating server group {}", name);
                self.client.create_server_group(name).await?
            }
        };
        self.sync_server_group(group, &server_ids(nodes)).await
    }

    /// Add missing members then remove stale ones, skipping empty calls
    pub(crate) async fn sync_server_group(
        &self,
        group: ServerGroup,
        desired: &[String],
    ) -> Result<ServerGroup, ControllerError> {
        let current = group.server_ids();
        let (inserts, deletes) = sync_lists(&current, desired);
        debug!(
            "Syncing server group {}: {:?} -> {:?}",
            group.id, current, desired
        );
        let mut result = group;
        if !inserts.is_empty() {
            info!("Adding servers {:?} to {}", inserts, result.id);
            result = self
                .client
                .add_servers_to_server_group(&result.id, &inserts)
                .await?;
        }
        if !deletes.is_empty() {
            info!("Removing servers {:?} from {}", deletes, result.id);
            result = self
                .client
                .remove_servers_from_server_group(&result.id, &deletes)
                .await?;
        }
        Ok(result)
    }

    async fn ensure_firewall_policy(&self, group: &ServerGroup) -> Result<FirewallPolicy, ControllerError> {
        if let Some(policy) = self.find_firewall_policy(&group.name).await? {
            return Ok(policy);
        }
        info!("Creating firewall policy {}", group.name);
        let options = FirewallPolicyOptions {
            name: group.name.clone(),
            server_group: group.id.clone(),
        };
        Ok(self.client.create_firewall_policy(&options).await?)
    }

    async fn ensure_firewall_rule(
        &self,
        spec: &ServiceSpec,
        policy: &FirewallPolicy,
    ) -> Result<(), ControllerError> {
        let desired = FirewallRuleOptions {
            firewall_policy: policy.id.clone(),
            protocol: self.config.firewall_protocol.clone(),
            source: self.config.firewall_source_cidr.clone(),
            destination_port: port_list(spec),
            description: policy.name.clone(),
        };
        match policy.rules.first() {
            None => {
                info!("Creating firewall rule for {}", policy.id);
                self.client.create_firewall_rule(&desired).await?;
            }
            Some(rule) if firewall_rule_needs_update(rule, &desired) => {
                info!("Updating firewall rule {}", rule.id);
                self.client.update_firewall_rule(&rule.id, &desired).await?;
            }
            Some(rule) => debug!("No rule update required for {}, skipping", rule.id),
        }
        Ok(())
    }

    /// Remove the firewall policy, if there is one
    pub(crate) async fn ensure_firewall_closed(&self, name: &str) -> Result<(), ControllerError> {
        debug!("Closing firewall for {}", name);
        let Some(policy) = self.find_firewall_policy(name).await? else {
            return Ok(());
        };
        info!("Destroying firewall policy {}", policy.id);
        self.client.destroy_firewall_policy(&policy.id).await?;
        Ok(())
    }

    /// Empty the server group and remove it, if there is one
    pub(crate) async fn ensure_server_group_deleted(&self, name: &str) -> Result<(), ControllerError> {
        debug!("Deleting server group for {}", name);
        let Some(group) = self.find_server_group(name).await? else {
            return Ok(());
        };
        let group = self.sync_server_group(group, &[]).await?;
        info!("Destroying server group {}", group.id);
        self.client.destroy_server_group(&group.id).await?;
        Ok(())
    }
}
