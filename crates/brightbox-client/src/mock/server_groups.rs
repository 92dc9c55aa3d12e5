//! Server group operations for MockBrightboxClient

use super::{MockBrightboxClient, helpers};
use crate::error::BrightboxError;
use crate::models::*;

pub async fn list_server_groups(client: &MockBrightboxClient) -> Result<Vec<ServerGroup>, BrightboxError> {
    Ok(client.server_groups())
}

pub async fn create_server_group(client: &MockBrightboxClient, name: &str) -> Result<ServerGroup, BrightboxError> {
    client.record("create_server_group", name);
    let group = helpers::server_group(client.next_id(), name, &[]);
    client.add_server_group(group.clone());
    Ok(group)
}

pub async fn add_servers_to_server_group(client: &MockBrightboxClient, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
    client.record("add_servers_to_server_group", id);
    let mut groups = client.server_groups.lock().unwrap();
    let group = groups
        .get_mut(id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Server group {} not found", id)))?;
    for server_id in server_ids {
        if !group.servers.iter().any(|s| &s.id == server_id) {
            group.servers.push(NestedServer { id: server_id.clone() });
        }
    }
    Ok(group.clone())
}

pub async fn remove_servers_from_server_group(client: &MockBrightboxClient, id: &str, server_ids: &[String]) -> Result<ServerGroup, BrightboxError> {
    client.record("remove_servers_from_server_group", id);
    let mut groups = client.server_groups.lock().unwrap();
    let group = groups
        .get_mut(id)
        .ok_or_else(|| BrightboxError::NotFound(format!("Server group {} not found", id)))?;
    group.servers.retain(|s| !server_ids.contains(&s.id));
    Ok(group.clone())
}

pub async fn destroy_server_group(client: &MockBrightboxClient, id: &str) -> Result<(), BrightboxError> {
    client.record("destroy_server_group", id);
    let in_use = client
        .firewall_policies
        .lock()
        .unwrap()
        .values()
        .any(|p| p.server_group.as_ref().is_some_and(|g| g.id == id));
    if in_use {
        return Err(BrightboxError::Api {
            status: 409,
            message: format!("Server group {} is used by a firewall policy", id),
        });
    }

    let mut groups = client.server_groups.lock().unwrap();
    match groups.get(id) {
        None => Err(BrightboxError::NotFound(format!("Server group {} not found", id))),
        Some(group) if !group.servers.is_empty() => Err(BrightboxError::Api {
            status: 409,
            message: format!("Server group {} still has servers", id),
        }),
        Some(_) => {
            groups.remove(id);
            Ok(())
        }
    }
}
