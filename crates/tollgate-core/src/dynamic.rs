// ABOUTME: Dynamic key installation on target hosts
// ABOUTME: Generates an RSA pair, uploads public key and install script, then runs the script

use crate::error::{CredsError, Result};
use crate::otp::TokenGenerator;
use crate::role::DynamicRole;
use crate::storage::{get_json, Storage};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tollgate_ssh::{
    fingerprint_openssh, generate_rsa_keypair, shell_quote, GeneratedKeyPair, RemoteHost,
    RemoteTarget,
};
use tracing::{debug, info, warn};

/// Storage prefix for shared host keys.
pub const HOST_KEY_PREFIX: &str = "keys/";

/// Shared administrative key used to reach a role's targets.
#[derive(Clone, Serialize, Deserialize)]
pub struct HostKey {
    pub key: String,
}

impl std::fmt::Debug for HostKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostKey(<redacted>)")
    }
}

/// Argument telling the install script to add (merge) the key.
const INSTALL_FLAG: &str = "install";

/// authorized_keys location for `username` on a target.
pub fn authorized_keys_path(username: &str) -> String {
    if username == "root" {
        "/root/.ssh/authorized_keys".to_string()
    } else {
        format!("/home/{username}/.ssh/authorized_keys")
    }
}

/// Shell command that runs the uploaded script in add mode against
/// `username`'s authorized_keys and removes the script afterwards. The
/// script's exit status is preserved.
pub fn install_command(script_file: &str, public_key_file: &str, username: &str) -> String {
    let script = shell_quote(script_file);
    format!(
        "chmod +x {script} && sudo bash {script} {INSTALL_FLAG} {key} {auth}; status=$?; rm -f {script}; exit $status",
        key = shell_quote(public_key_file),
        auth = shell_quote(&authorized_keys_path(username)),
    )
}

/// Installs freshly generated keys on targets through a [`RemoteHost`].
#[derive(Clone)]
pub struct KeyInstaller {
    remote: Arc<dyn RemoteHost>,
    tokens: TokenGenerator,
}

impl KeyInstaller {
    pub fn new(remote: Arc<dyn RemoteHost>, tokens: TokenGenerator) -> Self {
        Self { remote, tokens }
    }

    /// Generate a key pair and authorize its public half for `username` on
    /// `ip`. Returns the pair only if every step succeeded.
    ///
    /// Steps run strictly in order and stop at the first failure. Files
    /// already uploaded are left on the target.
    pub async fn install(
        &self,
        storage: &dyn Storage,
        role: &DynamicRole,
        username: &str,
        ip: IpAddr,
    ) -> Result<GeneratedKeyPair> {
        let host_key: HostKey = get_json(storage, &format!("{HOST_KEY_PREFIX}{}", role.key_name))
            .await?
            .ok_or_else(|| CredsError::HostKeyNotFound(role.key_name.clone()))?;

        let bits = role.key_bits;
        let comment = format!("{username}@{ip}");
        let pair = tokio::task::spawn_blocking(move || generate_rsa_keypair(bits, &comment))
            .await
            .map_err(CredsError::KeyGenerationTask)?
            .map_err(CredsError::KeyGeneration)?;
        debug!(bits, "generated dynamic key pair");

        let target = RemoteTarget {
            user: role.admin_user.clone(),
            host: ip,
            port: role.port,
            private_key: host_key.key,
        };

        // Temporary names only; nothing is recorded in storage
        let public_key_file = self.tokens.generate().salted;
        let script_file = format!("{public_key_file}.sh");

        self.remote
            .upload(&target, &public_key_file, pair.public_key.as_bytes())
            .await
            .map_err(CredsError::UploadPublicKey)?;

        self.remote
            .upload(&target, &script_file, role.install_script.as_bytes())
            .await
            .map_err(CredsError::UploadScript)?;

        let command = install_command(&script_file, &public_key_file, username);
        let output = self
            .remote
            .exec(&target, &command)
            .await
            .map_err(CredsError::InstallKey)?;
        debug!(stdout = %output.stdout_string().trim(), "install script finished");

        match fingerprint_openssh(&pair.public_key) {
            Ok(fingerprint) => {
                info!(%username, %ip, %fingerprint, "installed dynamic key")
            }
            Err(e) => warn!(error = %e, "installed dynamic key but could not fingerprint it"),
        }

        Ok(pair)
    }
}
