//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and wiring a
//! [`Reconciler`] to a [`MockBrightboxClient`].

use crate::backoff::RetryPolicy;
use crate::config::EngineConfig;
use crate::reconciler::domains::DomainResolver;
use crate::reconciler::Reconciler;
use crate::service::{ClusterNode, ServicePort, ServiceSpec};
use async_trait::async_trait;
use brightbox_client::MockBrightboxClient;
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Name used for the service under test
pub const TEST_NAME: &str = "web.default.k8s";

/// Default engine settings with a millisecond retry window
pub fn test_config() -> EngineConfig {
    EngineConfig {
        cluster_name: "k8s".to_string(),
        cloud_ip_retry: RetryPolicy {
            initial_delay: Duration::from_millis(1),
            factor: 1.2,
            steps: 5,
        },
        ..EngineConfig::default()
    }
}

/// TCP service with the given `(port, node_port)` pairs and annotations
pub fn create_test_spec(ports: &[(u16, u16)], annotations: &[(&str, &str)]) -> ServiceSpec {
    ServiceSpec {
        ports: ports.iter().map(|(p, n)| ServicePort::tcp(*p, *n)).collect(),
        annotations: annotations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Default::default()
    }
}

/// Nodes with `brightbox://` provider IDs for each server id
pub fn create_test_nodes(server_ids: &[&str]) -> Vec<ClusterNode> {
    server_ids
        .iter()
        .enumerate()
        .map(|(i, id)| ClusterNode::new(format!("node-{}", i), Some(&format!("brightbox://{}", id))))
        .collect()
}

/// DNS that answers for the mock's Cloud IP hostnames, plus explicit records
#[derive(Clone)]
pub struct CloudDnsResolver {
    mock: MockBrightboxClient,
    records: Arc<Mutex<HashMap<String, Vec<IpAddr>>>>,
}

impl CloudDnsResolver {
    pub fn new(mock: &MockBrightboxClient) -> Self {
        Self {
            mock: mock.clone(),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add or replace a record; it takes precedence over Cloud IP hostnames
    pub fn insert(&self, domain: &str, addresses: &[&str]) {
        let addresses = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.records
            .lock()
            .unwrap()
            .insert(domain.to_string(), addresses);
    }
}

#[async_trait]
impl DomainResolver for CloudDnsResolver {
    async fn lookup(&self, domain: &str) -> io::Result<Vec<IpAddr>> {
        if let Some(addresses) = self.records.lock().unwrap().get(domain) {
            return Ok(addresses.clone());
        }
        self.mock
            .cloud_ips()
            .into_iter()
            .find(|cip| cip.fqdn == domain || cip.reverse_dns == domain)
            .map(|cip| {
                [cip.public_ipv4, cip.public_ipv6]
                    .iter()
                    .filter_map(|a| a.parse().ok())
                    .collect()
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such host {}", domain)))
    }
}

/// Send engine logs to the test harness; set `RUST_LOG` to see them
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Reconciler over the mock, resolving Cloud IP hostnames only
pub fn create_test_reconciler(mock: &MockBrightboxClient) -> Reconciler {
    create_test_reconciler_with_resolver(mock, CloudDnsResolver::new(mock))
}

pub fn create_test_reconciler_with_resolver(
    mock: &MockBrightboxClient,
    resolver: CloudDnsResolver,
) -> Reconciler {
    init_test_tracing();
    Reconciler::with_resolver(Box::new(mock.clone()), Box::new(resolver), test_config()).unwrap()
}
