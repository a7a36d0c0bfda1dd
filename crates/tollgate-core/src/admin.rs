// ABOUTME: Writes the records issuance reads: roles, host keys, and the lease policy
// ABOUTME: Roles are validated before they are stored so issuance never sees a bad record

use crate::dynamic::{HostKey, HOST_KEY_PREFIX};
use crate::error::{CredsError, Result};
use crate::lease::{LeaseConfig, LEASE_CONFIG_KEY};
use crate::role::{Role, RoleEntry, ROLE_PREFIX};
use crate::storage::{Storage, StorageEntry};
use tracing::info;

/// Validate and store a role record, replacing any existing one.
pub async fn write_role(storage: &dyn Storage, name: &str, entry: RoleEntry) -> Result<Role> {
    let role =
        Role::from_entry(name, entry.clone()).map_err(|source| CredsError::InvalidRole {
            name: name.to_string(),
            source,
        })?;

    storage
        .put(StorageEntry::json(format!("{ROLE_PREFIX}{name}"), &entry)?)
        .await?;
    info!(role = %name, key_type = role.key_type.as_str(), "role written");
    Ok(role)
}

/// Store the private key used to reach targets of dynamic roles.
pub async fn write_host_key(storage: &dyn Storage, name: &str, key: String) -> Result<()> {
    storage
        .put(StorageEntry::json(
            format!("{HOST_KEY_PREFIX}{name}"),
            &HostKey { key },
        )?)
        .await?;
    info!(key = %name, "host key written");
    Ok(())
}

pub async fn write_lease(storage: &dyn Storage, config: LeaseConfig) -> Result<()> {
    storage
        .put(StorageEntry::json(LEASE_CONFIG_KEY, &config)?)
        .await?;
    info!(lease = config.lease, lease_max = config.lease_max, "lease policy written");
    Ok(())
}

/// Names of all stored roles, sorted.
pub async fn list_roles(storage: &dyn Storage) -> Result<Vec<String>> {
    Ok(storage.list(ROLE_PREFIX).await?)
}
