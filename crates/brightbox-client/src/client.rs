//! Brightbox API client
//!
//! Implements the resource calls over the `/1.0/` REST API.

use crate::brightbox_trait::BrightboxClientTrait;
use crate::common::HttpClient;
use crate::config::ClientConfig;
use crate::error::BrightboxError;
use crate::models::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Brightbox API client
pub struct BrightboxClient {
    http: HttpClient,
}

impl BrightboxClient {
    /// Create a client without contacting the API
    pub fn new(config: ClientConfig) -> Result<Self, BrightboxError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(BrightboxError::Http)?;
        Ok(Self {
            http: HttpClient::new(client, config),
        })
    }

    /// Create a client and obtain an access token, failing early on bad credentials
    pub async fn connect(config: ClientConfig) -> Result<Self, BrightboxError> {
        let client = Self::new(config)?;
        client.http.bearer().await?;
        info!("Authenticated against {}", client.http.api_url());
        Ok(client)
    }

    fn servers_body(server_ids: &[String]) -> serde_json::Value {
        json!({
            "servers": server_ids
                .iter()
                .map(|id| json!({ "server": id }))
                .collect::<Vec<_>>()
        })
    }
}

#[async_trait::async_trait]
impl BrightboxClientTrait for BrightboxClient {
    fn api_url(&self) -> &str {
        self.http.api_url()
    }

    async fn list_cloud_ips(&self) -> Result<Vec<CloudIp>, BrightboxError> {
        self.http.get("cloud_ips").await
    }

    async fn get_cloud_ip(&self, id: &str) -> Result<CloudIp, BrightboxError> {
        self.http.get(&format!("cloud_ips/{}", id)).await
    }

    async fn create_cloud_ip(&self, name: &str) -> Result<CloudIp, BrightboxError> {
        debug!("Creating Cloud IP {}", name);
        self.http.post("cloud_ips", &json!({ "name": name })).await
    }

    async fn map_cloud_ip(&self, id: &str, destination: &str) -> Result<(), BrightboxError> {
        self.http
            .post_action(&format!("cloud_ips/{}/map", id), &json!({ "destination": destination }))
            .await
    }

    async fn unmap_cloud_ip(&self, id: &str) -> Result<(), BrightboxError> {
        self.http
            .post_action(&format!("cloud_ips/{}/unmap", id), &json!({}))
            .await
    }

    async fn destroy_cloud_ip(&self, id: &str) -> Result<(), BrightboxError> {
        self.http.delete(&format!("cloud_ips/{}", id)).await
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BrightboxError> {
        self.http.get("load_balancers").await
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, BrightboxError> {
        self.http.get(&format!("load_balancers/{}", id)).await
    }

    async fn create_load_balancer(&self, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
        self.http
            .post("load_balancers", &serde_json::to_value(options)?)
            .await
    }

    async fn update_load_balancer(&self, id: &str, options: &LoadBalancerOptions) -> Result<LoadBalancer, BrightboxError> {
        self.http
            .put(&format!("load_balancers/{}", id), &serde_json::to_value(options)?)
            .await
    }

    async fn destroy_load_balancer(&self, id: &str) -> Result<(), BrightboxError> {
        self.http.delete(&format!("load_balancers/{}", id)).await
    }

    async fn list_server_groups(&self) -> Result<Vec<ServerGroup>, BrightboxError> {
        self.http.get("server_groups").await
    }

    async fn create_server_group(&self, name: &str) -> Result<ServerGroup, BrightboxError> {
        self.http.post("server_groups", &json!({ "name": name })).await
    }

    async fn add_servers_to_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
        self.http
            .post(&format!("server_groups/{}/add_servers", id), &Self::servers_body(server_ids))
            .await
    }

    async fn remove_servers_from_server_group(&self, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
        self.http
            .post(&format!("server_groups/{}/remove_servers", id), &Self::servers_body(server_ids))
            .await
    }

    async fn destroy_server_group(&self, id: &str) -> Result<(), BrightboxError> {
        self.http.delete(&format!("server_groups/{}", id)).await
    }

    async fn list_firewall_policies(&self) -> Result<Vec<FirewallPolicy>, BrightboxError> {
        self.http.get("firewall_policies").await
    }

    async fn create_firewall_policy(&self, options: &FirewallPolicyOptions) -> Result<FirewallPolicy, BrightboxError> {
        self.http
            .post("firewall_policies", &serde_json::to_value(options)?)
            .await
    }

    async fn destroy_firewall_policy(&self, id: &str) -> Result<(), BrightboxError> {
        self.http.delete(&format!("firewall_policies/{}", id)).await
    }

    async fn create_firewall_rule(&self, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
        self.http
            .post("firewall_rules", &serde_json::to_value(options)?)
            .await
    }

    async fn update_firewall_rule(&self, id: &str, options: &FirewallRuleOptions) -> Result<FirewallRule, BrightboxError> {
        self.http
            .put(&format!("firewall_rules/{}", id), &serde_json::to_value(options)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servers_body_shape() {
        let body = BrightboxClient::servers_body(&["srv-aaaaa".to_string(), "srv-bbbbb".to_string()]);
        assert_eq!(
            body,
            json!({ "servers": [{ "server": "srv-aaaaa" }, { "server": "srv-bbbbb" }] })
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = BrightboxClient::new(ClientConfig::default());
        assert!(matches!(result, Err(BrightboxError::Config(_))));
    }
}
