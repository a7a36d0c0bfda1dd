// ABOUTME: SSH building blocks for tollgate dynamic credentials
// ABOUTME: RSA key generation, fingerprints, and the remote copy/exec transport

pub mod error;
pub mod fingerprint;
pub mod key;
pub mod remote;

pub use error::{Result, SshError};
pub use fingerprint::{compute_fingerprint, fingerprint_openssh};
pub use key::{generate_rsa_keypair, GeneratedKeyPair, MIN_RSA_KEY_BITS};
pub use remote::{shell_quote, CommandOutput, RemoteHost, RemoteTarget, RusshRemote};
