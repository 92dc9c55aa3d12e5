//! Firewall operations for MockBrightboxClient
//!
//! Rules live inside their policy, as the API nests them.

use super::{MockBrightboxClient, helpers};
use crate::error::BrightboxError;
use crate::models::*;

pub async fn list_firewall_policies(client: &MockBrightboxClient) -> Result<Vec<FirewallPolicy>, BrightboxError> {
    Ok(client.firewall_policies())
}

pub async fn create_firewall_policy(client: &MockBrightboxClient, options: &FirewallPolicyOptions) -> Result<FirewallPolicy, BrightboxError> {
    client.record("create_firewall_policy", &options.name);
    let group = client
        .server_groups
        .lock()
        .unwrap()
        .get(&options.server_group)
        .cloned()
        .ok_or_else(|| BrightboxError::NotFound(format!("Server group {} not found", options.server_group)))?;
    let policy = helpers::firewall_policy(client.next_id(), &options.name, &group);
    client.add_firewall_policy(policy.clone());
    Ok(policy)
}

pub async fn destroy_firewall_policy(client: &MockBrightboxClient, id: &str) -> Result<(), BrightboxError> {
    client.record("destroy_firewall_policy", id);
    client
        .firewall_policies
        .lock()
        .unwrap()
        .remove(id)
        .map(|_| ())
        .ok_or_else(|| BrightboxError::NotFound(format!("Firewall policy {} not found", id)))
}

fn rule_from_options(id: String, options: &FirewallRuleOptions) -> FirewallRule {
    FirewallRule {
        id,
        protocol: Some(options.protocol.clone()),
        source: Some(options.source.clone()),
        destination_port: Some(options.destination_port.clone()),
        description: Some(options.description.clone()),
    }
}

pub async fn create_firewall_rule(client: &MockBrightboxClient, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
    client.record("create_firewall_rule", &options.firewall_policy);
    let id = helpers::resource_id("fwr", client.next_id());
    let mut policies = client.firewall_policies.lock().unwrap();
    let policy = policies
        .get_mut(&options.firewall_policy)
        .ok_or_else(|| BrightboxError::NotFound(format!("Firewall policy {} not found", options.firewall_policy)))?;
    let rule = rule_from_options(id, options);
    policy.rules.push(rule.clone());
    Ok(rule)
}

pub async fn update_firewall_rule(client: &MockBrightboxClient, id: &str, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
    client.record("update_firewall_rule", id);
    let mut policies = client.firewall_policies.lock().unwrap();
    let rule = policies
        .values_mut()
        .flat_map(|p| p.rules.iter_mut())
        .find(|r| r.id == id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Firewall rule {} not found", id)))?;
    *rule = rule_from_options(id.to_string(), options);
    Ok(rule.clone())
}
