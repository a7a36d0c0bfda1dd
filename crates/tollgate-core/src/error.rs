// ABOUTME: Error types for credential issuance using thiserror.
// ABOUTME: Splits user-correctable request errors from internal failures.

use crate::role::RoleError;
use crate::storage::StorageError;
use thiserror::Error;
use tollgate_ssh::SshError;

/// Errors that can occur while issuing a credential.
#[derive(Error, Debug)]
pub enum CredsError {
    /// Path did not match `creds/<role>`.
    #[error("invalid path '{0}': expected creds/<role>")]
    InvalidPath(String),

    #[error("missing role")]
    MissingRole,

    #[error("missing ip")]
    MissingIp,

    #[error("role '{0}' not found")]
    RoleNotFound(String),

    /// Neither the request nor the role supplies a username.
    #[error("no default username registered for role '{0}', use the 'username' field")]
    NoUsername(String),

    #[error("invalid IP '{0}'")]
    InvalidIp(String),

    #[error("IP {ip} is not permitted for role '{role}'")]
    IpNotPermitted { ip: String, role: String },

    /// Storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The stored role record is unusable.
    #[error("role '{name}' is invalid: {source}")]
    InvalidRole {
        name: String,
        #[source]
        source: RoleError,
    },

    #[error("host key '{0}' not found")]
    HostKeyNotFound(String),

    #[error("error generating key: {0}")]
    KeyGeneration(#[source] SshError),

    /// Key generation task panicked or was cancelled.
    #[error("key generation task failed: {0}")]
    KeyGenerationTask(#[source] tokio::task::JoinError),

    #[error("error uploading public key: {0}")]
    UploadPublicKey(#[source] SshError),

    #[error("error uploading install script: {0}")]
    UploadScript(#[source] SshError),

    #[error("error adding public key to authorized_keys file in target: {0}")]
    InstallKey(#[source] SshError),

    /// Every generated OTP collided with an existing entry.
    #[error("no free OTP slot found after {0} attempts")]
    OtpExhausted(u32),
}

impl CredsError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            CredsError::InvalidPath(_)
                | CredsError::MissingRole
                | CredsError::MissingIp
                | CredsError::RoleNotFound(_)
                | CredsError::NoUsername(_)
                | CredsError::InvalidIp(_)
                | CredsError::IpNotPermitted { .. }
        )
    }
}

/// Result type alias using CredsError.
pub type Result<T> = std::result::Result<T, CredsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_user_correctable() {
        let errors = [
            CredsError::InvalidPath("foo".to_string()),
            CredsError::MissingRole,
            CredsError::MissingIp,
            CredsError::RoleNotFound("web".to_string()),
            CredsError::NoUsername("web".to_string()),
            CredsError::InvalidIp("300.1.1.1".to_string()),
            CredsError::IpNotPermitted {
                ip: "192.168.1.1".to_string(),
                role: "web".to_string(),
            },
        ];
        for err in errors {
            assert!(err.is_request_error(), "{err} should be a request error");
        }
    }

    #[test]
    fn test_internal_errors_are_not_request_errors() {
        let errors = [
            CredsError::Storage(StorageError::Unavailable("down".to_string())),
            CredsError::InvalidRole {
                name: "web".to_string(),
                source: RoleError::UnknownKeyType("totp".to_string()),
            },
            CredsError::HostKeyNotFound("admin".to_string()),
            CredsError::KeyGeneration(SshError::KeySize {
                bits: 512,
                min: 2048,
            }),
            CredsError::OtpExhausted(8),
        ];
        for err in errors {
            assert!(!err.is_request_error(), "{err} should be internal");
        }
    }

    #[test]
    fn test_ip_not_permitted_display() {
        let err = CredsError::IpNotPermitted {
            ip: "192.168.1.1".to_string(),
            role: "web".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "IP 192.168.1.1 is not permitted for role 'web'"
        );
    }

    #[test]
    fn test_install_key_keeps_source() {
        use std::error::Error;

        let err = CredsError::InstallKey(SshError::NoExitStatus {
            addr: "10.0.0.5:22".to_string(),
        });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("authorized_keys"));
    }
}
