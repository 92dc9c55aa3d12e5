//! Fixture builders for MockBrightboxClient
//!
//! Addresses are derived from the numeric part of the resource id so tests can
//! predict them: Cloud IP `n` gets `109.107.39.n`, `2a02:1348:ffff:ffff::6d6b:n`,
//! reverse DNS `cip-109-107-39-n.gb1.brightbox.com` and FQDN
//! `cip-0000n.gb1.brightbox.com`.
//!
//! Resources created through the trait are numbered from 1 upwards, so
//! hand-built fixtures use numbers from 100 to keep identifiers apart.

use crate::models::*;

/// Format an API identifier such as `cip-00001`
pub fn resource_id(prefix: &str, n: u64) -> String {
    format!("{}-{:05}", prefix, n)
}

/// Build an unmapped Cloud IP with generated addresses
pub fn cloud_ip(n: u64, name: &str) -> CloudIp {
    let id = resource_id("cip", n);
    let octet = n % 256;
    CloudIp {
        fqdn: format!("{}.gb1.brightbox.com", id),
        id,
        name: name.to_string(),
        public_ipv4: format!("109.107.39.{}", octet),
        public_ipv6: format!("2a02:1348:ffff:ffff::6d6b:{}", octet),
        reverse_dns: format!("cip-109-107-39-{}.gb1.brightbox.com", octet),
        status: CloudIpState::Unmapped,
        load_balancer: None,
        created_at: Some(chrono::Utc::now()),
    }
}

/// Build a Cloud IP already mapped to a load balancer
pub fn mapped_cloud_ip(n: u64, name: &str, load_balancer: &LoadBalancer) -> CloudIp {
    CloudIp {
        status: CloudIpState::Mapped,
        load_balancer: Some(NestedLoadBalancer {
            id: load_balancer.id.clone(),
            name: load_balancer.name.clone(),
        }),
        ..cloud_ip(n, name)
    }
}

/// HTTP health check on `/healthz`
pub fn http_healthcheck(port: u16) -> Healthcheck {
    Healthcheck {
        check_type: HealthcheckType::Http,
        port,
        request: Some("/healthz".to_string()),
        interval: None,
        timeout: None,
        threshold_up: None,
        threshold_down: None,
    }
}

/// Plain HTTP listener
pub fn http_listener(in_port: u16, out_port: u16) -> Listener {
    Listener {
        protocol: ListenerProtocol::Http,
        in_port,
        out_port,
        timeout: None,
        proxy_protocol: None,
    }
}

/// Active load balancer with one HTTP listener and no nodes
pub fn load_balancer(n: u64, name: &str) -> LoadBalancer {
    LoadBalancer {
        id: resource_id("lba", n),
        name: name.to_string(),
        status: LoadBalancerState::Active,
        listeners: vec![http_listener(80, 31080)],
        healthcheck: http_healthcheck(31080),
        policy: None,
        nodes: Vec::new(),
        cloud_ips: Vec::new(),
        acme: None,
        https_redirect: false,
        created_at: Some(chrono::Utc::now()),
    }
}

/// Server group with the given members
pub fn server_group(n: u64, name: &str, server_ids: &[&str]) -> ServerGroup {
    ServerGroup {
        id: resource_id("grp", n),
        name: name.to_string(),
        servers: server_ids
            .iter()
            .map(|id| NestedServer { id: id.to_string() })
            .collect(),
    }
}

/// Firewall policy bound to a server group, without rules
pub fn firewall_policy(n: u64, name: &str, group: &ServerGroup) -> FirewallPolicy {
    FirewallPolicy {
        id: resource_id("fwp", n),
        name: name.to_string(),
        server_group: Some(NestedServerGroup {
            id: group.id.clone(),
            name: group.name.clone(),
        }),
        rules: Vec::new(),
    }
}

/// ACME descriptor with every domain in the given status
pub fn acme(domains: &[String], status: &str) -> Option<Acme> {
    if domains.is_empty() {
        return None;
    }
    Some(Acme {
        domains: domains
            .iter()
            .map(|identifier| AcmeDomain {
                identifier: identifier.clone(),
                status: status.to_string(),
                last_message: String::new(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_addresses_parse() {
        let cip = cloud_ip(7, "svc");
        assert_eq!(cip.id, "cip-00007");
        assert!(cip.public_ipv4.parse::<std::net::Ipv4Addr>().is_ok());
        assert!(cip.public_ipv6.parse::<std::net::Ipv6Addr>().is_ok());
        assert_eq!(cip.reverse_dns, "cip-109-107-39-7.gb1.brightbox.com");
    }
}
