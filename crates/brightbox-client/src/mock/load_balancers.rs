//! Load balancer operations for MockBrightboxClient
//!
//! Mapped Cloud IPs are not stored on the load balancer; they are filled in
//! from the Cloud IP store on every read, the way the API reports them.

use super::{MockBrightboxClient, helpers};
use crate::error::BrightboxError;
use crate::models::*;

pub(crate) fn snapshot(client: &MockBrightboxClient, id: &str) -> Option<LoadBalancer> {
    let mut lb = client.load_balancers.lock().unwrap().get(id).cloned()?;
    lb.cloud_ips = client
        .cloud_ips
        .lock()
        .unwrap()
        .values()
        .filter(|cip| cip.is_mapped_to(id))
        .cloned()
        .collect();
    Some(lb)
}

fn apply_options(client: &MockBrightboxClient, lb: &mut LoadBalancer, options: &LoadBalancerOptions) {
    lb.name = options.name.clone();
    lb.listeners = options.listeners.clone();
    lb.healthcheck = options.healthcheck.clone();
    if options.policy.is_some() {
        lb.policy = options.policy;
    }
    lb.nodes = options
        .nodes
        .iter()
        .map(|n| NestedServer { id: n.node.clone() })
        .collect();
    if let Some(domains) = &options.domains {
        let status = client.acme_domain_status.lock().unwrap().clone();
        lb.acme = helpers::acme(domains, &status);
    }
    if let Some(redirect) = options.https_redirect {
        lb.https_redirect = redirect;
    }
}

pub async fn list_load_balancers(client: &MockBrightboxClient) -> Result<Vec<LoadBalancer>, BrightboxError> {
    Ok(client.load_balancers())
}

pub async fn get_load_balancer(client: &MockBrightboxClient, id: &str) -> Result<LoadBalancer, BrightboxError> {
    snapshot(client, id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Load balancer {} not found", id)))
}

pub async fn create_load_balancer(client: &MockBrightboxClient, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
    client.record("create_load_balancer", &options.name);
    let mut lb = helpers::load_balancer(client.next_id(), &options.name);
    lb.status = *client.created_load_balancer_status.lock().unwrap();
    lb.policy = Some(BalancingPolicy::LeastConnections);
    apply_options(client, &mut lb, options);
    let id = lb.id.clone();
    client.add_load_balancer(lb);
    get_load_balancer(client, &id).await
}

pub async fn update_load_balancer(client: &MockBrightboxClient, id: &str, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
    client.record("update_load_balancer", id);
    {
        let mut load_balancers = client.load_balancers.lock().unwrap();
        let lb = load_balancers
            .get_mut(id)
            .ok_or_else(|| BrightboxError::NotFound(format!("Load balancer {} not found", id)))?;
        apply_options(client, lb, options);
    }
    get_load_balancer(client, id).await
}

pub async fn destroy_load_balancer(client: &MockBrightboxClient, id: &str) -> Result<(), BrightboxError> {
    client.record("destroy_load_balancer", id);
    {
        let mut load_balancers = client.load_balancers.lock().unwrap();
        let lb = load_balancers
            .get_mut(id)
            .ok_or_else(|| BrightboxError::NotFound(format!("Load balancer {} not found", id)))?;
        lb.status = LoadBalancerState::Deleted;
    }
    // Deleting a load balancer releases its Cloud IPs
    for cip in client.cloud_ips.lock().unwrap().values_mut() {
        if cip.is_mapped_to(id) {
            cip.status = CloudIpState::Unmapped;
            cip.load_balancer = None;
        }
    }
    Ok(())
}
