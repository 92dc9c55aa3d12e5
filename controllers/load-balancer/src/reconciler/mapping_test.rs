//! Unit tests for the Cloud IP mapping manager

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use brightbox_client::mock::helpers;
    use brightbox_client::{BrightboxError, CloudIpState, MockBrightboxClient};

    #[tokio::test]
    async fn test_already_mapped_cloud_ip_is_left_alone() {
        let mock = MockBrightboxClient::default();
        let lb = helpers::load_balancer(100, TEST_NAME);
        let cip = helpers::mapped_cloud_ip(101, TEST_NAME, &lb);
        mock.add_load_balancer(lb.clone());
        mock.add_cloud_ip(cip.clone());
        let reconciler = create_test_reconciler(&mock);

        reconciler.ensure_mapped_cloud_ip(&lb, &cip).await.unwrap();

        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_cloud_ip_is_mapped() {
        let mock = MockBrightboxClient::default();
        let lb = helpers::load_balancer(100, TEST_NAME);
        let cip = helpers::cloud_ip(101, TEST_NAME);
        mock.add_load_balancer(lb.clone());
        mock.add_cloud_ip(cip.clone());
        let reconciler = create_test_reconciler(&mock);

        reconciler.ensure_mapped_cloud_ip(&lb, &cip).await.unwrap();

        assert_eq!(mock.write_calls(), vec!["map_cloud_ip:cip-00101"]);
        let stored = &mock.cloud_ips()[0];
        assert_eq!(stored.status, CloudIpState::Mapped);
        assert!(stored.is_mapped_to("lba-00100"));
    }

    #[tokio::test]
    async fn test_cloud_ip_mapped_elsewhere_is_not_taken() {
        let mock = MockBrightboxClient::default();
        let lb = helpers::load_balancer(100, TEST_NAME);
        let other = helpers::load_balancer(102, "other.default.k8s");
        let cip = helpers::mapped_cloud_ip(101, TEST_NAME, &other);
        mock.add_load_balancer(lb.clone());
        mock.add_load_balancer(other);
        mock.add_cloud_ip(cip.clone());
        let reconciler = create_test_reconciler(&mock);

        let result = reconciler.ensure_mapped_cloud_ip(&lb, &cip).await;

        match result {
            Err(ControllerError::UnexplainedMapping { cloud_ip, target }) => {
                assert_eq!(cloud_ip, "cip-00101");
                assert_eq!(target, "lba-00102");
            }
            other => panic!("expected UnexplainedMapping, got {:?}", other),
        }
        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_without_destination_reports_unknown() {
        let mock = MockBrightboxClient::default();
        let lb = helpers::load_balancer(100, TEST_NAME);
        let mut cip = helpers::cloud_ip(101, TEST_NAME);
        cip.status = CloudIpState::Mapped;
        let reconciler = create_test_reconciler(&mock);

        let result = reconciler.ensure_mapped_cloud_ip(&lb, &cip).await;

        assert!(matches!(
            result,
            Err(ControllerError::UnexplainedMapping { ref target, .. }) if target == "unknown destination"
        ));
    }

    #[tokio::test]
    async fn test_only_replaced_cloud_ips_are_unmapped() {
        let mock = MockBrightboxClient::default();
        let mut lb = helpers::load_balancer(100, TEST_NAME);
        lb.cloud_ips = vec![
            helpers::mapped_cloud_ip(101, TEST_NAME, &lb),
            helpers::mapped_cloud_ip(102, TEST_NAME, &lb),
            helpers::mapped_cloud_ip(103, "legacy", &lb),
        ];
        mock.add_load_balancer(lb.clone());
        for cip in &lb.cloud_ips {
            mock.add_cloud_ip(cip.clone());
        }
        let reconciler = create_test_reconciler(&mock);

        reconciler
            .ensure_old_cloud_ips_deposed(&lb, "cip-00102")
            .await
            .unwrap();

        assert_eq!(
            mock.write_calls(),
            vec!["unmap_cloud_ip:cip-00101", "unmap_cloud_ip:cip-00103"]
        );
    }

    #[tokio::test]
    async fn test_deletion_spares_current_and_foreign_cloud_ips() {
        let mock = MockBrightboxClient::default();
        mock.add_cloud_ip(helpers::cloud_ip(101, TEST_NAME));
        mock.add_cloud_ip(helpers::cloud_ip(102, TEST_NAME));
        mock.add_cloud_ip(helpers::cloud_ip(103, "other.default.k8s"));
        let reconciler = create_test_reconciler(&mock);

        reconciler
            .ensure_cloud_ips_deleted(Some("cip-00102"), TEST_NAME)
            .await
            .unwrap();

        let remaining: Vec<String> = mock.cloud_ips().into_iter().map(|c| c.id).collect();
        assert_eq!(remaining, vec!["cip-00102", "cip-00103"]);
        assert_eq!(mock.write_calls(), vec!["destroy_cloud_ip:cip-00101"]);
    }

    #[tokio::test]
    async fn test_deletion_with_nothing_to_do_makes_no_calls() {
        let mock = MockBrightboxClient::default();
        mock.add_cloud_ip(helpers::cloud_ip(101, TEST_NAME));
        let reconciler = create_test_reconciler(&mock);

        reconciler
            .ensure_cloud_ips_deleted(Some("cip-00101"), TEST_NAME)
            .await
            .unwrap();

        assert!(mock.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_recovers_from_transient_failures() {
        let mock = MockBrightboxClient::default();
        mock.add_cloud_ip(helpers::cloud_ip(101, TEST_NAME));
        mock.inject_destroy_failures(3);
        let reconciler = create_test_reconciler(&mock);

        reconciler.ensure_cloud_ips_deleted(None, TEST_NAME).await.unwrap();

        assert_eq!(mock.count_calls("destroy_cloud_ip"), 4);
        assert!(mock.cloud_ips().is_empty());
    }

    #[tokio::test]
    async fn test_mapped_cloud_ip_exhausts_retries() {
        let mock = MockBrightboxClient::default();
        let lb = helpers::load_balancer(100, "someone-else");
        mock.add_load_balancer(lb.clone());
        mock.add_cloud_ip(helpers::mapped_cloud_ip(101, TEST_NAME, &lb));
        let reconciler = create_test_reconciler(&mock);

        let result = reconciler.ensure_cloud_ips_deleted(None, TEST_NAME).await;

        assert!(matches!(
            result,
            Err(ControllerError::Cloud(BrightboxError::Api { status: 409, .. }))
        ));
        assert_eq!(
            mock.count_calls("destroy_cloud_ip"),
            test_config().cloud_ip_retry.steps as usize
        );
        assert_eq!(mock.cloud_ips().len(), 1);
    }
}
