//! BrightboxClient trait for mocking
//!
//! This trait is the narrow capability set the load balancer engine needs.
//! The concrete [`crate::BrightboxClient`] implements it, and tests use
//! [`crate::MockBrightboxClient`] (behind the `test-util` feature).

use crate::error::BrightboxError;
use crate::models::*;

/// Trait for Brightbox API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Lookups of a single resource return [`BrightboxError::NotFound`] when it
/// does not exist.
#[async_trait::async_trait]
pub trait BrightboxClientTrait: Send + Sync {
    /// Get the API base URL
    fn api_url(&self) -> &str;

    // Cloud IPs
    async fn list_cloud_ips(&self) -> Result<Vec<CloudIp>, BrightboxError>;
    async fn get_cloud_ip(&self, id: &str) -> Result<CloudIp, BrightboxError>;
    async fn create_cloud_ip(&self, name: &str) -> Result<CloudIp, BrightboxError>;
    async fn map_cloud_ip(&self, id: &str, destination: &str) -> Result<(), BrightboxError>;
    async fn unmap_cloud_ip(&self, id: &str) -> Result<(), BrightboxError>;
    async fn destroy_cloud_ip(&self, id: &str) -> Result<(), BrightboxError>;

    // Load balancers
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BrightboxError>;
    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, BrightboxError>;
    async fn create_load_balancer(&self, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError>;
    async fn update_load_balancer(&self, id: &str, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError>;
    async fn destroy_load_balancer(&self, id: &str) -> Result<(), BrightboxError>;

    // Server groups
    async fn list_server_groups(&self) -> Result<Vec<ServerGroup>, BrightboxError>;
    async fn create_server_group(&self, name: &str) -> Result<ServerGroup, BrightboxError>;
    async fn add_servers_to_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError>;
    async fn remove_servers_from_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError>;
    async fn destroy_server_group(&self, id: &str) -> Result<(), BrightboxError>;

    // Firewall
    async fn list_firewall_policies(&self) -> Result<Vec<FirewallPolicy>, BrightboxError>;
    async fn create_firewall_policy(&self, options: &FirewallPolicyOptions) -> Result<FirewallPolicy, BrightboxError>;
    async fn destroy_firewall_policy(&self, id: &str) -> Result<(), BrightboxError>;
    async fn create_firewall_rule(&self, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError>;
    async fn update_firewall_rule(&self, id: &str, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError>;
}
