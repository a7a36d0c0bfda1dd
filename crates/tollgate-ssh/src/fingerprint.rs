// ABOUTME: SSH public key fingerprint computation.
// ABOUTME: Hex SHA256 over the SSH wire encoding, used to identify installed dynamic keys in logs.

use crate::error::{Result, SshError};
use sha2::{Digest, Sha256};
use ssh_key::PublicKey;

/// Compute SHA256 fingerprint of a public key (hex encoded, lowercase).
///
/// The hash covers the SSH wire encoding of the key data (algorithm name
/// followed by the algorithm-specific fields), so it works for RSA as well as
/// ed25519 keys and matches `ssh-keygen -l -E sha256` modulo encoding.
///
/// # Returns
/// A 64-character lowercase hex string representing the SHA256 hash.
pub fn compute_fingerprint(public_key: &PublicKey) -> Result<String> {
    let wire_data = public_key.to_bytes().map_err(SshError::SerializeKey)?;

    let mut hasher = Sha256::new();
    hasher.update(&wire_data);
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint a key given as an authorized_keys line.
pub fn fingerprint_openssh(openssh: &str) -> Result<String> {
    let public_key = PublicKey::from_openssh(openssh).map_err(SshError::ParsePublicKey)?;
    compute_fingerprint(&public_key)
}
