// ABOUTME: creds/<role> issuance - request, response, and the orchestrating backend
// ABOUTME: validate -> OTP or dynamic key -> lease -> response, stopping at the first failure

use crate::dynamic::KeyInstaller;
use crate::error::{CredsError, Result};
use crate::lease::Lease;
use crate::otp::{OtpIssuer, TokenGenerator};
use crate::role::{validate_request, KeyType};
use crate::salt::Salt;
use crate::storage::Storage;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tollgate_ssh::RemoteHost;
use tracing::info;

/// A parsed `creds/<role>` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredsPath {
    pub role: String,
}

impl CredsPath {
    pub fn parse(path: &str) -> Result<Self> {
        static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| Regex::new(r"^creds/(?P<role>[A-Za-z0-9_-]+)$"));

        pattern
            .as_ref()
            .ok()
            .and_then(|pattern| pattern.captures(path))
            .map(|caps| Self {
                role: caps["role"].to_string(),
            })
            .ok_or_else(|| CredsError::InvalidPath(path.to_string()))
    }
}

/// Fields of an issuance request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredsRequest {
    pub role: String,
    pub username: Option<String>,
    pub ip: String,
}

impl CredsRequest {
    /// Build a request from a `creds/<role>` path and its fields.
    pub fn for_path(path: &str, username: Option<String>, ip: impl Into<String>) -> Result<Self> {
        let CredsPath { role } = CredsPath::parse(path)?;
        Ok(Self {
            role,
            username,
            ip: ip.into(),
        })
    }
}

/// Kind of secret issued, for later revocation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    Otp,
    DynamicKey,
}

/// Data returned to the caller.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key_type", rename_all = "lowercase")]
pub enum CredentialData {
    /// `key` is the raw one-time password.
    Otp { key: String },
    /// `key` is the generated private key.
    Dynamic { key: String },
}

impl CredentialData {
    pub fn key_type(&self) -> &'static str {
        match self {
            CredentialData::Otp { .. } => "otp",
            CredentialData::Dynamic { .. } => "dynamic",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CredentialData::Otp { key } | CredentialData::Dynamic { key } => key,
        }
    }
}

impl std::fmt::Debug for CredentialData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialData")
            .field("key_type", &self.key_type())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Metadata kept with the secret for revocation, not necessarily shown to
/// the caller.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InternalData {
    Otp {
        otp: String,
    },
    Dynamic {
        admin_user: String,
        username: String,
        ip: String,
        host_key_name: String,
        dynamic_public_key: String,
        port: u16,
        install_script: String,
    },
}

impl std::fmt::Debug for InternalData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternalData::Otp { .. } => f.write_str("InternalData::Otp { .. }"),
            InternalData::Dynamic {
                admin_user,
                username,
                ip,
                host_key_name,
                port,
                ..
            } => f
                .debug_struct("InternalData::Dynamic")
                .field("admin_user", admin_user)
                .field("username", username)
                .field("ip", ip)
                .field("host_key_name", host_key_name)
                .field("port", port)
                .finish_non_exhaustive(),
        }
    }
}

/// A leased secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredsResponse {
    pub secret_type: SecretType,
    pub data: CredentialData,
    pub internal: InternalData,
    #[serde(serialize_with = "as_secs")]
    pub lease_duration: Duration,
    #[serde(serialize_with = "as_secs")]
    pub lease_grace_period: Duration,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

/// Knobs for the issuance pipeline.
#[derive(Debug, Clone, Copy)]
pub struct IssuerSettings {
    /// Bound on OTP collision retries.
    pub max_otp_attempts: u32,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        Self {
            max_otp_attempts: crate::otp::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Handles `creds/<role>` writes.
///
/// Holds no per-request state; everything durable lives in `storage`.
#[derive(Clone)]
pub struct CredsBackend {
    storage: Arc<dyn Storage>,
    otp: OtpIssuer,
    installer: KeyInstaller,
}

impl CredsBackend {
    pub fn new(
        storage: Arc<dyn Storage>,
        salt: Salt,
        remote: Arc<dyn RemoteHost>,
        settings: IssuerSettings,
    ) -> Self {
        let tokens = TokenGenerator::new(salt);
        Self::with_tokens(storage, tokens, remote, settings)
    }

    /// Like [`CredsBackend::new`] with an explicit token generator.
    pub fn with_tokens(
        storage: Arc<dyn Storage>,
        tokens: TokenGenerator,
        remote: Arc<dyn RemoteHost>,
        settings: IssuerSettings,
    ) -> Self {
        Self {
            storage,
            otp: OtpIssuer::new(tokens.clone(), settings.max_otp_attempts),
            installer: KeyInstaller::new(remote, tokens),
        }
    }

    /// Issue a credential for `request`.
    pub async fn issue(&self, request: &CredsRequest) -> Result<CredsResponse> {
        let storage = self.storage.as_ref();
        let validated = validate_request(storage, request).await?;
        let role = &validated.role;
        let ip = validated.ip;
        let username = validated.username;

        let (secret_type, data, internal) = match &role.key_type {
            KeyType::Otp => {
                let otp = self.otp.issue(storage, &username, ip).await?;
                (
                    SecretType::Otp,
                    CredentialData::Otp { key: otp.clone() },
                    InternalData::Otp { otp },
                )
            }
            KeyType::Dynamic(dynamic) => {
                let pair = self.installer.install(storage, dynamic, &username, ip).await?;
                (
                    SecretType::DynamicKey,
                    CredentialData::Dynamic {
                        key: pair.private_key,
                    },
                    InternalData::Dynamic {
                        admin_user: dynamic.admin_user.clone(),
                        username: username.clone(),
                        ip: ip.to_string(),
                        host_key_name: dynamic.key_name.clone(),
                        dynamic_public_key: pair.public_key,
                        port: dynamic.port,
                        install_script: dynamic.install_script.clone(),
                    },
                )
            }
        };

        let lease = Lease::resolve(storage).await;
        info!(
            role = %role.name,
            key_type = role.key_type.as_str(),
            %username,
            %ip,
            lease_secs = lease.duration.as_secs(),
            "issued credential"
        );

        Ok(CredsResponse {
            secret_type,
            data,
            internal,
            lease_duration: lease.duration,
            lease_grace_period: lease.grace_period,
        })
    }

    /// Issue for a raw `creds/<role>` path.
    pub async fn issue_path(
        &self,
        path: &str,
        username: Option<String>,
        ip: impl Into<String>,
    ) -> Result<CredsResponse> {
        let request = CredsRequest::for_path(path, username, ip)?;
        self.issue(&request).await
    }
}
