//! Unit tests for the reconciler entry points

#[cfg(test)]
mod tests {
    use crate::annotations;
    use crate::error::{ControllerError, ValidationError};
    use crate::test_utils::*;
    use brightbox_client::mock::helpers;
    use brightbox_client::{
        BrightboxError, HealthcheckType, ListenerProtocol, LoadBalancerState, MockBrightboxClient,
    };

    fn hostnames(status: &k8s_openapi::api::core::v1::LoadBalancerStatus) -> Vec<String> {
        status
            .ingress
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|i| i.hostname)
            .collect()
    }

    #[tokio::test]
    async fn test_no_ports_fails_without_writes() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);

        let result = reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[], &[]), &create_test_nodes(&["srv-aaaaa"]))
            .await;

        assert!(matches!(
            result,
            Err(ControllerError::Validation(ValidationError::NoPorts))
        ));
        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_domains_without_tls_port_fails_without_writes() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(8443, 31443)], &[(annotations::SSL_DOMAINS, "www.example.com")]);

        let result = reconciler.ensure_load_balancer(TEST_NAME, &spec, &[]).await;

        assert!(matches!(
            result,
            Err(ControllerError::Validation(ValidationError::TlsPortMissing(443)))
        ));
        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_creates_all_resources() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);

        let status = reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa", "srv-bbbbb"]))
            .await
            .unwrap();

        let cip = &mock.cloud_ips()[0];
        assert_eq!(cip.name, TEST_NAME);
        assert_eq!(hostnames(&status), vec![cip.reverse_dns.clone(), cip.fqdn.clone()]);

        let lbs = mock.load_balancers();
        assert_eq!(lbs.len(), 1);
        let lb = &lbs[0];
        assert_eq!(lb.name, TEST_NAME);
        assert_eq!(lb.listeners.len(), 1);
        assert_eq!(lb.listeners[0].protocol, ListenerProtocol::Http);
        assert_eq!((lb.listeners[0].in_port, lb.listeners[0].out_port), (80, 31080));
        assert_eq!(lb.healthcheck.check_type, HealthcheckType::Http);
        assert_eq!(lb.healthcheck.port, 31080);
        assert_eq!(lb.healthcheck.request.as_deref(), Some("/healthz"));
        let nodes: Vec<_> = lb.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(nodes, vec!["srv-aaaaa", "srv-bbbbb"]);
        assert!(!lb.https_redirect);
        assert!(lb.acme.is_none());
        assert!(cip.is_mapped_to(&lb.id));

        let groups = mock.server_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, TEST_NAME);
        assert_eq!(groups[0].servers.len(), 2);

        let policies = mock.firewall_policies();
        assert_eq!(policies.len(), 1);
        let rule = &policies[0].rules[0];
        assert_eq!(rule.destination_port.as_deref(), Some("31080"));
        assert_eq!(rule.source.as_deref(), Some("10.0.0.0/8"));
        assert_eq!(rule.protocol.as_deref(), Some("tcp"));
        assert_eq!(rule.description.as_deref(), Some(TEST_NAME));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080), (443, 31443)], &[]);
        let nodes = create_test_nodes(&["srv-aaaaa", "srv-bbbbb"]);

        reconciler.ensure_load_balancer(TEST_NAME, &spec, &nodes).await.unwrap();
        mock.clear_write_calls();
        reconciler.ensure_load_balancer(TEST_NAME, &spec, &nodes).await.unwrap();

        assert!(mock.write_calls().is_empty(), "unexpected writes: {:?}", mock.write_calls());
        assert_eq!(mock.load_balancers().len(), 1);
        assert_eq!(mock.cloud_ips().len(), 1);
    }

    #[tokio::test]
    async fn test_changed_listener_order_updates_once() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let nodes = create_test_nodes(&["srv-aaaaa"]);

        reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080), (8080, 31081)], &[]), &nodes)
            .await
            .unwrap();
        reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(8080, 31081), (80, 31080)], &[]), &nodes)
            .await
            .unwrap();

        assert_eq!(mock.count_calls("create_load_balancer"), 1);
        assert_eq!(mock.count_calls("update_load_balancer"), 1);
        let lb = &mock.load_balancers()[0];
        assert_eq!(lb.listeners[0].in_port, 8080);
        // Health check follows the first port
        assert_eq!(lb.healthcheck.port, 31081);
        assert_eq!(
            mock.firewall_policies()[0].rules[0].destination_port.as_deref(),
            Some("31081,31080")
        );
    }

    #[tokio::test]
    async fn test_node_changes_sync_membership() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);

        reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa", "srv-bbbbb", "srv-ccccc"]))
            .await
            .unwrap();
        mock.clear_write_calls();
        reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-ddddd", "srv-ccccc", "srv-bbbbb"]))
            .await
            .unwrap();

        assert_eq!(mock.count_calls("add_servers_to_server_group"), 1);
        assert_eq!(mock.count_calls("remove_servers_from_server_group"), 1);
        assert_eq!(mock.count_calls("update_load_balancer"), 1);
        let mut members = mock.server_groups()[0].server_ids();
        members.sort();
        assert_eq!(members, vec!["srv-bbbbb", "srv-ccccc", "srv-ddddd"]);
    }

    #[tokio::test]
    async fn test_tls_service_certifies_verified_domains() {
        let mock = MockBrightboxClient::default();
        let resolver = CloudDnsResolver::new(&mock);
        // The first Cloud IP the mock allocates is cip-00001
        resolver.insert("www.example.com", &["109.107.39.1"]);
        let reconciler = create_test_reconciler_with_resolver(&mock, resolver);
        let spec = create_test_spec(
            &[(80, 31080), (443, 31443)],
            &[(annotations::SSL_DOMAINS, "www.example.com")],
        );

        reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa"]))
            .await
            .unwrap();

        let lb = &mock.load_balancers()[0];
        assert_eq!(lb.listeners[0].protocol, ListenerProtocol::Http);
        assert_eq!(lb.listeners[1].protocol, ListenerProtocol::Https);
        assert!(lb.https_redirect);
        let domains: Vec<_> = lb
            .acme
            .as_ref()
            .unwrap()
            .domains
            .iter()
            .map(|d| d.identifier.as_str())
            .collect();
        assert_eq!(
            domains,
            vec![
                "cip-00001.gb1.brightbox.com",
                "cip-109-107-39-1.gb1.brightbox.com",
                "www.example.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_unvalidated_domain_is_incomplete() {
        let mock = MockBrightboxClient::default();
        mock.set_acme_domain_status("pending");
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(443, 31443)], &[]);

        let err = reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::DomainUnvalidated { ref status, .. } if status == "pending"));
        assert!(err.is_incomplete());
    }

    #[tokio::test]
    async fn test_unresolved_domain_stops_before_load_balancer() {
        let mock = MockBrightboxClient::default();
        let resolver = CloudDnsResolver::new(&mock);
        resolver.insert("www.example.com", &["192.0.2.10"]);
        let reconciler = create_test_reconciler_with_resolver(&mock, resolver);
        let spec = create_test_spec(
            &[(80, 31080), (443, 31443)],
            &[(annotations::SSL_DOMAINS, "www.example.com")],
        );

        let result = reconciler.ensure_load_balancer(TEST_NAME, &spec, &[]).await;

        assert!(matches!(
            result,
            Err(ControllerError::DomainNotResolved { ref domain, .. }) if domain == "www.example.com"
        ));
        assert_eq!(mock.count_calls("create_load_balancer"), 0);
        assert_eq!(mock.count_calls("create_server_group"), 0);
    }

    #[tokio::test]
    async fn test_failed_load_balancer_is_reported_as_building() {
        let mock = MockBrightboxClient::default();
        mock.set_created_load_balancer_status(LoadBalancerState::Failed);
        let reconciler = create_test_reconciler(&mock);

        let err = reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080)], &[]), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::StillBuilding(_)));
    }

    #[tokio::test]
    async fn test_deleted_load_balancer_name_is_not_reused() {
        let mock = MockBrightboxClient::default();
        let mut old = helpers::load_balancer(100, TEST_NAME);
        old.status = LoadBalancerState::Deleted;
        mock.add_load_balancer(old);
        let reconciler = create_test_reconciler(&mock);

        reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080)], &[]), &[])
            .await
            .unwrap();

        assert_eq!(mock.count_calls("create_load_balancer"), 1);
        assert_eq!(mock.count_calls("update_load_balancer"), 0);
        assert_eq!(mock.load_balancers().len(), 2);
    }

    #[tokio::test]
    async fn test_cloud_ip_mapped_elsewhere_is_unexplained() {
        let mock = MockBrightboxClient::default();
        let other = helpers::load_balancer(100, "other.default.k8s");
        mock.add_load_balancer(other.clone());
        mock.add_cloud_ip(helpers::mapped_cloud_ip(101, "reserved", &other));
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[(annotations::CLOUDIP_ALLOCATIONS, "cip-00101")]);

        let result = reconciler.ensure_load_balancer(TEST_NAME, &spec, &[]).await;

        assert!(matches!(
            result,
            Err(ControllerError::UnexplainedMapping { ref cloud_ip, ref target })
                if cloud_ip == "cip-00101" && target == "lba-00100"
        ));
        assert_eq!(mock.count_calls("map_cloud_ip"), 0);
    }

    #[tokio::test]
    async fn test_replacing_cloud_ip_deposes_and_destroys_old_one() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let nodes = create_test_nodes(&["srv-aaaaa"]);

        reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080)], &[]), &nodes)
            .await
            .unwrap();
        let original = mock.cloud_ips()[0].id.clone();
        mock.add_cloud_ip(helpers::cloud_ip(150, "reserved"));

        let spec = create_test_spec(&[(80, 31080)], &[(annotations::CLOUDIP_ALLOCATIONS, "cip-00150")]);
        reconciler.ensure_load_balancer(TEST_NAME, &spec, &nodes).await.unwrap();

        let remaining: Vec<_> = mock.cloud_ips().into_iter().map(|c| c.id).collect();
        assert_eq!(remaining, vec!["cip-00150"]);
        assert!(mock.write_calls().contains(&format!("unmap_cloud_ip:{}", original)));
        let lb = &mock.load_balancers()[0];
        assert_eq!(lb.cloud_ips.len(), 1);
        assert_eq!(lb.cloud_ips[0].id, "cip-00150");
    }

    #[tokio::test]
    async fn test_update_load_balancer_delegates() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);

        reconciler
            .update_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080)], &[]), &[])
            .await
            .unwrap();

        assert_eq!(mock.count_calls("create_load_balancer"), 1);
    }

    #[tokio::test]
    async fn test_get_load_balancer() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        assert!(reconciler.get_load_balancer(TEST_NAME).await.unwrap().is_none());

        reconciler
            .ensure_load_balancer(TEST_NAME, &create_test_spec(&[(80, 31080)], &[]), &[])
            .await
            .unwrap();

        let status = reconciler.get_load_balancer(TEST_NAME).await.unwrap().unwrap();
        assert_eq!(hostnames(&status).len(), 2);
    }

    #[tokio::test]
    async fn test_deletion_removes_everything() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);
        reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa", "srv-bbbbb"]))
            .await
            .unwrap();

        reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await.unwrap();

        assert!(mock.cloud_ips().is_empty());
        assert!(mock.server_groups().is_empty());
        assert!(mock.firewall_policies().is_empty());
        assert_eq!(mock.load_balancers()[0].status, LoadBalancerState::Deleted);
        assert!(reconciler.get_load_balancer(TEST_NAME).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deletion_is_idempotent() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);

        reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await.unwrap();
        assert!(mock.write_calls().is_empty());

        reconciler
            .ensure_load_balancer(TEST_NAME, &spec, &create_test_nodes(&["srv-aaaaa"]))
            .await
            .unwrap();
        reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await.unwrap();
        mock.clear_write_calls();
        reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await.unwrap();
        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_retries_transient_destroy_failures() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);
        reconciler.ensure_load_balancer(TEST_NAME, &spec, &[]).await.unwrap();
        mock.inject_destroy_failures(2);

        reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await.unwrap();

        assert_eq!(mock.count_calls("destroy_cloud_ip"), 3);
        assert!(mock.cloud_ips().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_surfaces_last_error_after_budget() {
        let mock = MockBrightboxClient::default();
        let reconciler = create_test_reconciler(&mock);
        let spec = create_test_spec(&[(80, 31080)], &[]);
        reconciler.ensure_load_balancer(TEST_NAME, &spec, &[]).await.unwrap();
        mock.inject_destroy_failures(10);

        let result = reconciler.ensure_load_balancer_deleted(TEST_NAME, &spec).await;

        assert!(matches!(
            result,
            Err(ControllerError::Cloud(BrightboxError::Api { status: 409, .. }))
        ));
        assert_eq!(mock.count_calls("destroy_cloud_ip"), 5);
        assert_eq!(mock.cloud_ips().len(), 1);
    }
}
