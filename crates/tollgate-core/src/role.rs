// ABOUTME: Role records and the request policy check against them
// ABOUTME: Stored RoleEntry is converted to a typed Role at load time; validate_request applies its policy

use crate::creds::CredsRequest;
use crate::error::{CredsError, Result};
use crate::storage::{get_json, Storage};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;

/// Storage prefix for role records.
pub const ROLE_PREFIX: &str = "roles/";

const DEFAULT_PORT: u16 = 22;
const DEFAULT_KEY_BITS: usize = 2048;

/// Why a stored role record was rejected.
#[derive(Error, Debug)]
pub enum RoleError {
    #[error("unknown key type '{0}'")]
    UnknownKeyType(String),

    #[error("invalid CIDR block '{cidr}': {source}")]
    InvalidCidr {
        cidr: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    /// A dynamic role is missing one of its required fields.
    #[error("dynamic role is missing '{0}'")]
    MissingField(&'static str),
}

/// Role record as written by role management.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleEntry {
    #[serde(default)]
    pub default_user: String,
    /// Comma-separated CIDR blocks.
    #[serde(default)]
    pub cidr_list: String,
    pub key_type: String,
    #[serde(default)]
    pub admin_user: String,
    /// Name of the host key under `keys/`.
    #[serde(default, rename = "key")]
    pub key_name: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub key_bits: Option<usize>,
    #[serde(default)]
    pub install_script: String,
}

/// Settings only dynamic roles carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRole {
    pub admin_user: String,
    pub key_name: String,
    pub port: u16,
    pub key_bits: usize,
    pub install_script: String,
}

/// How credentials for a role are issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    Otp,
    Dynamic(DynamicRole),
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Otp => "otp",
            KeyType::Dynamic(_) => "dynamic",
        }
    }
}

/// A validated role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub default_user: Option<String>,
    pub cidrs: Vec<IpNet>,
    pub key_type: KeyType,
}

impl Role {
    /// Convert a stored record, rejecting anything issuance could not act on.
    pub fn from_entry(
        name: impl Into<String>,
        entry: RoleEntry,
    ) -> std::result::Result<Self, RoleError> {
        let cidrs = parse_cidr_list(&entry.cidr_list)?;

        let key_type = match entry.key_type.as_str() {
            "otp" => KeyType::Otp,
            "dynamic" => KeyType::Dynamic(DynamicRole {
                admin_user: required(entry.admin_user, "admin_user")?,
                key_name: required(entry.key_name, "key")?,
                port: entry.port.unwrap_or(DEFAULT_PORT),
                key_bits: entry.key_bits.unwrap_or(DEFAULT_KEY_BITS),
                install_script: required(entry.install_script, "install_script")?,
            }),
            other => return Err(RoleError::UnknownKeyType(other.to_string())),
        };

        Ok(Self {
            name: name.into(),
            default_user: Some(entry.default_user).filter(|u| !u.is_empty()),
            cidrs,
            key_type,
        })
    }

    /// Whether `ip` falls inside any of the role's CIDR blocks.
    pub fn permits(&self, ip: IpAddr) -> bool {
        self.cidrs.iter().any(|net| net.contains(&ip))
    }
}

fn required(value: String, field: &'static str) -> std::result::Result<String, RoleError> {
    if value.is_empty() {
        Err(RoleError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn parse_cidr_list(list: &str) -> std::result::Result<Vec<IpNet>, RoleError> {
    list.split(',')
        .map(str::trim)
        .filter(|cidr| !cidr.is_empty())
        .map(|cidr| {
            cidr.parse::<IpNet>().map_err(|source| RoleError::InvalidCidr {
                cidr: cidr.to_string(),
                source,
            })
        })
        .collect()
}

/// Load a role by name. `Ok(None)` if no such role exists.
pub async fn load_role(storage: &dyn Storage, name: &str) -> Result<Option<Role>> {
    let key = format!("{ROLE_PREFIX}{name}");
    let Some(entry) = get_json::<RoleEntry>(storage, &key).await? else {
        return Ok(None);
    };

    Role::from_entry(name, entry)
        .map(Some)
        .map_err(|source| CredsError::InvalidRole {
            name: name.to_string(),
            source,
        })
}

/// Parse an IP and fold IPv4-mapped IPv6 addresses back to IPv4.
pub fn canonical_ip(raw: &str) -> Option<IpAddr> {
    match raw.parse::<IpAddr>().ok()? {
        IpAddr::V6(v6) => Some(
            v6.to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
        ),
        v4 => Some(v4),
    }
}

/// A request that passed the role's policy.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub role: Role,
    pub username: String,
    pub ip: IpAddr,
}

/// Check a request against its role.
///
/// Empty role and IP are rejected before storage is touched. Read-only.
pub async fn validate_request(
    storage: &dyn Storage,
    request: &CredsRequest,
) -> Result<ValidatedRequest> {
    if request.role.is_empty() {
        return Err(CredsError::MissingRole);
    }
    if request.ip.is_empty() {
        return Err(CredsError::MissingIp);
    }

    let role = load_role(storage, &request.role)
        .await?
        .ok_or_else(|| CredsError::RoleNotFound(request.role.clone()))?;

    let username = request
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| role.default_user.clone())
        .ok_or_else(|| CredsError::NoUsername(role.name.clone()))?;

    let ip = canonical_ip(&request.ip).ok_or_else(|| CredsError::InvalidIp(request.ip.clone()))?;
    if !role.permits(ip) {
        return Err(CredsError::IpNotPermitted {
            ip: ip.to_string(),
            role: role.name.clone(),
        });
    }

    debug!(role = %role.name, %username, %ip, "request permitted");
    Ok(ValidatedRequest { role, username, ip })
}
