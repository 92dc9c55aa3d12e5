//! Cloud IP operations for MockBrightboxClient

use super::{MockBrightboxClient, helpers};
use crate::error::BrightboxError;
use crate::models::*;

pub async fn list_cloud_ips(client: &MockBrightboxClient) -> Result<Vec<CloudIp>, BrightboxError> {
    Ok(client.cloud_ips())
}

pub async fn get_cloud_ip(client: &MockBrightboxClient, id: &str) -> Result<CloudIp, BrightboxError> {
    client
        .cloud_ips
        .lock()
        .unwrap()
        .get(id)
        .cloned()
        .ok_or_else(|| BrightboxError::NotFound(format!("Cloud IP {} not found", id)))
}

pub async fn create_cloud_ip(client: &MockBrightboxClient, name: &str) -> Result<CloudIp, BrightboxError> {
    client.record("create_cloud_ip", name);
    let cip = helpers::cloud_ip(client.next_id(), name);
    client.add_cloud_ip(cip.clone());
    Ok(cip)
}

pub async fn map_cloud_ip(client: &MockBrightboxClient, id: &str, destination: &str) -> Result<(), BrightboxError> {
    client.record("map_cloud_ip", id);
    let lb_name = client
        .load_balancers
        .lock()
        .unwrap()
        .get(destination)
        .map(|lb| lb.name.clone())
        .ok_or_else(|| BrightboxError::NotFound(format!("Load balancer {} not found", destination)))?;

    let mut cloud_ips = client.cloud_ips.lock().unwrap();
    let cip = cloud_ips
        .get_mut(id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Cloud IP {} not found", id)))?;
    if cip.status == CloudIpState::Mapped && !cip.is_mapped_to(destination) {
        return Err(BrightboxError::Api {
            status: 409,
            message: format!("Cloud IP {} is already mapped", id),
        });
    }
    cip.status = CloudIpState::Mapped;
    cip.load_balancer = Some(NestedLoadBalancer {
        id: destination.to_string(),
        name: lb_name,
    });
    Ok(())
}

pub async fn unmap_cloud_ip(client: &MockBrightboxClient, id: &str) -> Result<(), BrightboxError> {
    client.record("unmap_cloud_ip", id);
    let mut cloud_ips = client.cloud_ips.lock().unwrap();
    let cip = cloud_ips
        .get_mut(id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Cloud IP {} not found", id)))?;
    cip.status = CloudIpState::Unmapped;
    cip.load_balancer = None;
    Ok(())
}

pub async fn destroy_cloud_ip(client: &MockBrightboxClient, id: &str) -> Result<(), BrightboxError> {
    client.record("destroy_cloud_ip", id);
    {
        let mut failures = client.destroy_cloud_ip_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(BrightboxError::Api {
                status: 409,
                message: format!("Cloud IP {} is still being unmapped", id),
            });
        }
    }

    let mut cloud_ips = client.cloud_ips.lock().unwrap();
    match cloud_ips.get(id) {
        None => Err(BrightboxError::NotFound(format!("Cloud IP {} not found", id))),
        Some(cip) if cip.status == CloudIpState::Mapped => Err(BrightboxError::Api {
            status: 409,
            message: format!("Cloud IP {} is mapped", id),
        }),
        Some(_) => {
            cloud_ips.remove(id);
            Ok(())
        }
    }
}
