// ABOUTME: Error types for SSH key and transport operations using thiserror.
// ABOUTME: Provides typed errors for key generation, host key decoding, connect, auth, and exec.

use thiserror::Error;

/// Errors that can occur during SSH key or remote operations.
#[derive(Error, Debug)]
pub enum SshError {
    /// Requested RSA modulus is below the supported minimum.
    #[error("RSA key size {bits} is below the minimum of {min} bits")]
    KeySize { bits: usize, min: usize },

    /// Failed to generate an SSH key.
    #[error("failed to generate SSH key: {0}")]
    GenerateKey(#[source] ssh_key::Error),

    /// Failed to serialize a key.
    #[error("failed to serialize key: {0}")]
    SerializeKey(#[source] ssh_key::Error),

    /// Failed to parse an OpenSSH public key.
    #[error("failed to parse public key: {0}")]
    ParsePublicKey(#[source] ssh_key::Error),

    /// The administrative host key could not be decoded.
    #[error("failed to decode host key: {0}")]
    DecodeHostKey(String),

    /// Connecting to the target did not finish within the timeout.
    #[error("connection to {addr} timed out after {secs}s")]
    Timeout { addr: String, secs: u64 },

    /// Transport-level failure reported by russh.
    #[error("SSH protocol error talking to {addr}: {source}")]
    Protocol {
        addr: String,
        #[source]
        source: russh::Error,
    },

    /// The target refused the administrative key.
    #[error("authentication as {user}@{addr} was rejected")]
    Auth { user: String, addr: String },

    /// The remote command ended without reporting an exit status.
    #[error("remote command on {addr} ended without an exit status")]
    NoExitStatus { addr: String },

    /// The remote command exited non-zero.
    #[error("remote command on {addr} exited with status {status}: {stderr}")]
    RemoteCommand {
        addr: String,
        status: u32,
        stderr: String,
    },
}

/// Result type alias using SshError.
pub type Result<T> = std::result::Result<T, SshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_size_error_display() {
        let err = SshError::KeySize {
            bits: 1024,
            min: 2048,
        };
        let display = format!("{}", err);
        assert!(display.contains("1024"));
        assert!(display.contains("2048"));
    }

    #[test]
    fn test_generate_key_error_display() {
        let err = SshError::GenerateKey(ssh_key::Error::AlgorithmUnknown);
        let display = format!("{}", err);
        assert!(display.contains("failed to generate SSH key"));
    }

    #[test]
    fn test_timeout_error_display() {
        let err = SshError::Timeout {
            addr: "10.0.0.5:22".to_string(),
            secs: 10,
        };
        let display = format!("{}", err);
        assert!(display.contains("10.0.0.5:22"));
        assert!(display.contains("10s"));
    }

    #[test]
    fn test_auth_error_display() {
        let err = SshError::Auth {
            user: "admin".to_string(),
            addr: "10.0.0.5:22".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authentication as admin@10.0.0.5:22 was rejected"
        );
    }

    #[test]
    fn test_remote_command_error_display() {
        let err = SshError::RemoteCommand {
            addr: "10.0.0.5:22".to_string(),
            status: 2,
            stderr: "sudo: a password is required".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("status 2"));
        assert!(display.contains("sudo: a password is required"));
    }

    #[test]
    fn test_error_source_generate_key() {
        use std::error::Error;

        let err = SshError::GenerateKey(ssh_key::Error::AlgorithmUnknown);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_no_source_decode_host_key() {
        use std::error::Error;

        let err = SshError::DecodeHostKey("bad armor".to_string());
        assert!(err.source().is_none());
    }
}
