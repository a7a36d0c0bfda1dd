// ABOUTME: Lease shaping for issued credentials
// ABOUTME: Mount-level policy from config/lease when present, 10m/2m defaults otherwise

use crate::storage::{get_json, Storage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Storage key for the mount-level lease policy.
pub const LEASE_CONFIG_KEY: &str = "config/lease";

pub const DEFAULT_LEASE: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_LEASE_GRACE: Duration = Duration::from_secs(2 * 60);

/// Stored lease policy, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    pub lease: u64,
    pub lease_max: u64,
}

/// Validity window attached to an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub duration: Duration,
    pub grace_period: Duration,
}

impl Default for Lease {
    fn default() -> Self {
        Self {
            duration: DEFAULT_LEASE,
            grace_period: DEFAULT_LEASE_GRACE,
        }
    }
}

impl Lease {
    /// Policy duration with its maximum as grace, or the defaults.
    pub fn from_policy(policy: Option<LeaseConfig>) -> Self {
        match policy {
            Some(config) => Self {
                duration: Duration::from_secs(config.lease),
                grace_period: Duration::from_secs(config.lease_max),
            },
            None => Self::default(),
        }
    }

    /// Look up the configured policy. Lookup failures fall back to the
    /// defaults and never block issuance.
    pub async fn resolve(storage: &dyn Storage) -> Self {
        let policy = match get_json::<LeaseConfig>(storage, LEASE_CONFIG_KEY).await {
            Ok(policy) => policy,
            Err(e) => {
                warn!(error = %e, "lease policy lookup failed, using defaults");
                None
            }
        };
        Self::from_policy(policy)
    }
}
