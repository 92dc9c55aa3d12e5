//! Cloud IP mapping manager
//!
//! Maps the resolved Cloud IP onto the load balancer, unmaps any Cloud IP
//! it replaces and destroys Cloud IPs left over under the service's name.

use super::Reconciler;
use crate::backoff::{retry_with_backoff, Attempt};
use crate::error::ControllerError;
use brightbox_client::{CloudIp, CloudIpState, LoadBalancer};
use tracing::{debug, info};

impl Reconciler {
    /// Map the Cloud IP onto the load balancer unless it already is.
    ///
    /// A Cloud IP mapped anywhere else is an operator problem and is never
    /// remapped automatically.
    pub(crate) async fn ensure_mapped_cloud_ip(
        &self,
        lb: &LoadBalancer,
        cip: &CloudIp,
    ) -> Result<(), ControllerError> {
        if cip.is_mapped_to(&lb.id) {
            debug!("Cloud IP {} already mapped to {}", cip.id, lb.id);
            return Ok(());
        }
        if cip.status == CloudIpState::Mapped {
            let target = cip
                .load_balancer
                .as_ref()
                .map(|other| other.id.clone())
                .unwrap_or_else(|| "unknown destination".to_string());
            return Err(ControllerError::UnexplainedMapping {
                cloud_ip: cip.id.clone(),
                target,
            });
        }
        info!("Mapping Cloud IP {} to {}", cip.id, lb.id);
        self.client.map_cloud_ip(&cip.id, &lb.id).await?;
        Ok(())
    }

    /// Unmap every Cloud IP on the load balancer other than `current_id`
    pub(crate) async fn ensure_old_cloud_ips_deposed(
        &self,
        lb: &LoadBalancer,
        current_id: &str,
    ) -> Result<(), ControllerError> {
        for cip in lb.cloud_ips.iter().filter(|cip| cip.id != current_id) {
            info!("Unmapping deposed Cloud IP {} from {}", cip.id, lb.id);
            self.client.unmap_cloud_ip(&cip.id).await?;
        }
        Ok(())
    }

    /// Destroy every Cloud IP named `name` except `current_id`.
    ///
    /// A destroy can race with an unmap the API has not finished, so failed
    /// destroys are retried under the configured backoff. Failing to list
    /// Cloud IPs ends the loop at once.
    pub(crate) async fn ensure_cloud_ips_deleted(
        &self,
        current_id: Option<&str>,
        name: &str,
    ) -> Result<(), ControllerError> {
        debug!("Ensuring Cloud IPs named {} are deleted", name);
        retry_with_backoff(&self.config.cloud_ip_retry, "Cloud IP deletion", || async move {
            let cloud_ips = self
                .client
                .list_cloud_ips()
                .await
                .map_err(|e| Attempt::Fatal(ControllerError::from(e)))?;
            self.destroy_cloud_ips(&cloud_ips, current_id, name)
                .await
                .map_err(Attempt::Transient)
        })
        .await
    }

    /// Stops at the first failure
    async fn destroy_cloud_ips(
        &self,
        cloud_ips: &[CloudIp],
        current_id: Option<&str>,
        name: &str,
    ) -> Result<(), ControllerError> {
        let doomed = cloud_ips
            .iter()
            .filter(|cip| cip.name == name && Some(cip.id.as_str()) != current_id);
        for cip in doomed {
            info!("Destroying Cloud IP {}", cip.id);
            if let Err(e) = self.client.destroy_cloud_ip(&cip.id).await {
                debug!("Error destroying Cloud IP {}: {}", cip.id, e);
                return Err(e.into());
            }
        }
        Ok(())
    }
}
