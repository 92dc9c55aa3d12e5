//! Mock BrightboxClient for unit testing
//!
//! This module provides an in-memory implementation of [`BrightboxClientTrait`]
//! so the load balancer engine can be exercised without a Brightbox account.
//!
//! The mock is organized into resource-specific modules:
//! - `cloud_ips.rs` - Cloud IP allocation, mapping and destruction
//! - `load_balancers.rs` - Load balancer CRUD and ACME domain status
//! - `server_groups.rs` - Server groups and membership
//! - `firewall.rs` - Firewall policies and rules
//! - `helpers.rs` - Fixture builders and generated addresses
//!
//! Every mutating call is appended to a write log so tests can assert that an
//! idempotent pass issues no writes.

mod cloud_ips;
mod firewall;
pub mod helpers;
mod load_balancers;
mod server_groups;

use crate::brightbox_trait::BrightboxClientTrait;
use crate::error::BrightboxError;
use crate::models::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Mock BrightboxClient for testing
///
/// Clones share the same stores, so a test can keep a handle while the engine
/// owns a boxed copy.
#[derive(Clone)]
pub struct MockBrightboxClient {
    pub(crate) api_url: String,
    // In-memory storage keyed by resource id, listed in id order
    pub(crate) cloud_ips: Arc<Mutex<BTreeMap<String, CloudIp>>>,
    pub(crate) load_balancers: Arc<Mutex<BTreeMap<String, LoadBalancer>>>,
    pub(crate) server_groups: Arc<Mutex<BTreeMap<String, ServerGroup>>>,
    pub(crate) firewall_policies: Arc<Mutex<BTreeMap<String, FirewallPolicy>>>,
    pub(crate) write_log: Arc<Mutex<Vec<(String, String)>>>,
    // Fault injection and behaviour knobs
    pub(crate) destroy_cloud_ip_failures: Arc<Mutex<u32>>,
    pub(crate) created_load_balancer_status: Arc<Mutex<LoadBalancerState>>,
    pub(crate) acme_domain_status: Arc<Mutex<String>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl Default for MockBrightboxClient {
    fn default() -> Self {
        Self::new("https://api.mock.brightbox.test")
    }
}

impl MockBrightboxClient {
    /// Create a new, empty mock client
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            cloud_ips: Arc::new(Mutex::new(BTreeMap::new())),
            load_balancers: Arc::new(Mutex::new(BTreeMap::new())),
            server_groups: Arc::new(Mutex::new(BTreeMap::new())),
            firewall_policies: Arc::new(Mutex::new(BTreeMap::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            destroy_cloud_ip_failures: Arc::new(Mutex::new(0)),
            created_load_balancer_status: Arc::new(Mutex::new(LoadBalancerState::Active)),
            acme_domain_status: Arc::new(Mutex::new(ACME_DOMAIN_VALID.to_string())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a Cloud IP to the mock store (for test setup)
    pub fn add_cloud_ip(&self, cloud_ip: CloudIp) {
        self.cloud_ips.lock().unwrap().insert(cloud_ip.id.clone(), cloud_ip);
    }

    /// Add a load balancer to the mock store (for test setup)
    ///
    /// Its `cloud_ips` field is ignored; mappings are derived from the Cloud IP store.
    pub fn add_load_balancer(&self, load_balancer: LoadBalancer) {
        self.load_balancers
            .lock()
            .unwrap()
            .insert(load_balancer.id.clone(), load_balancer);
    }

    /// Add a server group to the mock store (for test setup)
    pub fn add_server_group(&self, server_group: ServerGroup) {
        self.server_groups
            .lock()
            .unwrap()
            .insert(server_group.id.clone(), server_group);
    }

    /// Add a firewall policy to the mock store (for test setup)
    pub fn add_firewall_policy(&self, policy: FirewallPolicy) {
        self.firewall_policies
            .lock()
            .unwrap()
            .insert(policy.id.clone(), policy);
    }

    /// Make the next `count` Cloud IP destroy calls fail with a conflict
    pub fn inject_destroy_failures(&self, count: u32) {
        *self.destroy_cloud_ip_failures.lock().unwrap() = count;
    }

    /// Status given to newly created load balancers (default: active)
    pub fn set_created_load_balancer_status(&self, status: LoadBalancerState) {
        *self.created_load_balancer_status.lock().unwrap() = status;
    }

    /// Change the status of an existing load balancer
    pub fn set_load_balancer_status(&self, id: &str, status: LoadBalancerState) {
        if let Some(lb) = self.load_balancers.lock().unwrap().get_mut(id) {
            lb.status = status;
        }
    }

    /// ACME status reported for requested domains (default: `valid`)
    pub fn set_acme_domain_status(&self, status: impl Into<String>) {
        let status = status.into();
        *self.acme_domain_status.lock().unwrap() = status.clone();
        for lb in self.load_balancers.lock().unwrap().values_mut() {
            if let Some(acme) = lb.acme.as_mut() {
                for domain in &mut acme.domains {
                    domain.status = status.clone();
                }
            }
        }
    }

    /// Snapshot of all Cloud IPs
    pub fn cloud_ips(&self) -> Vec<CloudIp> {
        self.cloud_ips.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of all load balancers, including deleted ones
    pub fn load_balancers(&self) -> Vec<LoadBalancer> {
        let ids: Vec<String> = self.load_balancers.lock().unwrap().keys().cloned().collect();
        ids.iter()
            .filter_map(|id| load_balancers::snapshot(self, id))
            .collect()
    }

    /// Snapshot of all server groups
    pub fn server_groups(&self) -> Vec<ServerGroup> {
        self.server_groups.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of all firewall policies
    pub fn firewall_policies(&self) -> Vec<FirewallPolicy> {
        self.firewall_policies.lock().unwrap().values().cloned().collect()
    }

    /// Every mutating call so far, formatted as `operation:target`
    pub fn write_calls(&self) -> Vec<String> {
        self.write_log
            .lock()
            .unwrap()
            .iter()
            .map(|(op, target)| format!("{}:{}", op, target))
            .collect()
    }

    /// Number of mutating calls of one operation, e.g. `"update_load_balancer"`
    pub fn count_calls(&self, operation: &str) -> usize {
        self.write_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .count()
    }

    /// Forget recorded write calls
    pub fn clear_write_calls(&self) {
        self.write_log.lock().unwrap().clear();
    }

    pub(crate) fn record(&self, operation: &str, target: &str) {
        self.write_log
            .lock()
            .unwrap()
            .push((operation.to_string(), target.to_string()));
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl BrightboxClientTrait for MockBrightboxClient {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    // Cloud IPs - delegated to cloud_ips module
    async fn list_cloud_ips(&self) -> Result<Vec<CloudIp>, BrightboxError> {
        cloud_ips::list_cloud_ips(self).await
    }

    async fn get_cloud_ip(&self, id: &str) -> Result<CloudIp, BrightboxError> {
        cloud_ips::get_cloud_ip(self, id).await
    }

    async fn create_cloud_ip(&self, name: &str) -> Result<CloudIp, BrightboxError> {
        cloud_ips::create_cloud_ip(self, name).await
    }

    async fn map_cloud_ip(&self, id: &str, destination: &str) -> Result<(), BrightboxError> {
        cloud_ips::map_cloud_ip(self, id, destination).await
    }

    async fn unmap_cloud_ip(&self, id: &str) -> Result<(), BrightboxError> {
        cloud_ips::unmap_cloud_ip(self, id).await
    }

    async fn destroy_cloud_ip(&self, id: &str) -> Result<(), BrightboxError> {
        cloud_ips::destroy_cloud_ip(self, id).await
    }

    // Load balancers - delegated to load_balancers module
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BrightboxError> {
        load_balancers::list_load_balancers(self).await
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, BrightboxError> {
        load_balancers::get_load_balancer(self, id).await
    }

    async fn create_load_balancer(&self, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
        load_balancers::create_load_balancer(self, options).await
    }

    async fn update_load_balancer(&self, id: &str, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
        load_balancers::update_load_balancer(self, id, options).await
    }

    async fn destroy_load_balancer(&self, id: &str) -> Result<(), BrightboxError> {
        load_balancers::destroy_load_balancer(self, id).await
    }

    // Server groups - delegated to server_groups module
    async fn list_server_groups(&self) -> Result<Vec<ServerGroup>, BrightboxError> {
        server_groups::list_server_groups(self).await
    }

    async fn create_server_group(&self, name: &str) -> Result<ServerGroup, BrightboxError> {
        server_groups::create_server_group(self, name).await
    }

    async fn add_servers_to_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
        server_groups::add_servers_to_server_group(self, id, server_ids).await
    }

    async fn remove_servers_from_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
        server_groups::remove_servers_from_server_group(self, id, server_ids).await
    }

    async fn destroy_server_group(&self, id: &str) -> Result<(), BrightboxError> {
        server_groups::destroy_server_group(self, id).await
    }

    // Firewall - delegated to firewall module
    async fn list_firewall_policies(&self) -> Result<Vec<FirewallPolicy>, BrightboxError> {
        firewall::list_firewall_policies(self).await
    }

    async fn create_firewall_policy(&self, options: &FirewallPolicyOptions) -> Result<FirewallPolicy, BrightboxError> {
        firewall::create_firewall_policy(self, options).await
    }

    async fn destroy_firewall_policy(&self, id: &str) -> Result<(), BrightboxError> {
        firewall::destroy_firewall_policy(self, id).await
    }

    async fn create_firewall_rule(&self, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
        firewall::create_firewall_rule(self, options).await
    }

    async fn update_firewall_rule(&self, id: &str, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
        firewall::update_firewall_rule(self, id, options).await
    }
}
