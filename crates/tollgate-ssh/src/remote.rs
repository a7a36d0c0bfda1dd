// ABOUTME: Remote copy and remote exec against target hosts over SSH.
// ABOUTME: RemoteHost is the seam the installer talks to; RusshRemote opens one connection per call.

use crate::error::{Result, SshError};
use async_trait::async_trait;
use russh::client::{self, AuthResult, Handle};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey};
use russh::{ChannelMsg, Disconnect};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Where and as whom a remote operation runs.
#[derive(Clone)]
pub struct RemoteTarget {
    /// Administrative user on the target.
    pub user: String,
    pub host: IpAddr,
    pub port: u16,
    /// Shared administrative private key (OpenSSH or PEM armor).
    pub private_key: String,
}

impl RemoteTarget {
    /// `host:port` form used in logs and errors.
    pub fn addr(&self) -> String {
        match self.host {
            IpAddr::V4(v4) => format!("{}:{}", v4, self.port),
            IpAddr::V6(v6) => format!("[{}]:{}", v6, self.port),
        }
    }
}

impl std::fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// Output of a remote command.
#[derive(Debug, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: u32,
}

impl CommandOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Authenticated file transfer and command execution on a target.
///
/// Implementations must return `Err` for a non-zero exit status so callers
/// can treat any `Ok` as a completed step.
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// Write `contents` to `path` on the target. Relative paths land in the
    /// admin user's home directory.
    async fn upload(&self, target: &RemoteTarget, path: &str, contents: &[u8]) -> Result<()>;

    /// Run `command` through the target's login shell.
    async fn exec(&self, target: &RemoteTarget, command: &str) -> Result<CommandOutput>;
}

/// Quote `value` for a POSIX shell as a single word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// russh-backed transport. Every call opens a fresh connection and closes it
/// before returning.
#[derive(Debug, Clone)]
pub struct RusshRemote {
    connect_timeout: Duration,
}

impl RusshRemote {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn connect(&self, target: &RemoteTarget) -> Result<Handle<TargetHandler>> {
        let addr = target.addr();
        let key = russh::keys::decode_secret_key(&target.private_key, None)
            .map_err(|e| SshError::DecodeHostKey(e.to_string()))?;

        debug!(%addr, user = %target.user, "connecting to target");
        let config = Arc::new(client::Config::default());
        let handler = TargetHandler { addr: addr.clone() };
        let mut handle = timeout(
            self.connect_timeout,
            client::connect(config, (target.host, target.port), handler),
        )
        .await
        .map_err(|_| SshError::Timeout {
            addr: addr.clone(),
            secs: self.connect_timeout.as_secs(),
        })?
        .map_err(|source| SshError::Protocol {
            addr: addr.clone(),
            source,
        })?;

        // RSA admin keys need an rsa-sha2-* signature on modern servers
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|source| SshError::Protocol {
                addr: addr.clone(),
                source,
            })?
            .flatten();

        let auth = handle
            .authenticate_publickey(
                &target.user,
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(|source| SshError::Protocol {
                addr: addr.clone(),
                source,
            })?;

        match auth {
            AuthResult::Success => Ok(handle),
            AuthResult::Failure { .. } => Err(SshError::Auth {
                user: target.user.clone(),
                addr,
            }),
        }
    }

    /// Run `command`, optionally feeding `stdin`, and collect its output.
    async fn run(
        &self,
        target: &RemoteTarget,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let addr = target.addr();
        let handle = self.connect(target).await?;
        let protocol = |source: russh::Error| SshError::Protocol {
            addr: addr.clone(),
            source,
        };

        let mut channel = handle.channel_open_session().await.map_err(protocol)?;
        channel.exec(true, command).await.map_err(protocol)?;
        if let Some(data) = stdin {
            channel.data(data).await.map_err(protocol)?;
            channel.eof().await.map_err(protocol)?;
        }

        let mut output = CommandOutput::default();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => output.stdout.extend_from_slice(&data),
                // ext 1 is stderr
                ChannelMsg::ExtendedData { data, ext: 1 } => {
                    output.stderr.extend_from_slice(&data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!(%addr, error = %e, "disconnect failed");
        }

        output.exit_code = exit_code.ok_or_else(|| SshError::NoExitStatus { addr: addr.clone() })?;
        if !output.is_success() {
            return Err(SshError::RemoteCommand {
                addr,
                status: output.exit_code,
                stderr: output.stderr_string().trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl RemoteHost for RusshRemote {
    async fn upload(&self, target: &RemoteTarget, path: &str, contents: &[u8]) -> Result<()> {
        debug!(addr = %target.addr(), path, bytes = contents.len(), "uploading file");
        let command = format!("umask 077 && cat > {}", shell_quote(path));
        self.run(target, &command, Some(contents)).await?;
        Ok(())
    }

    async fn exec(&self, target: &RemoteTarget, command: &str) -> Result<CommandOutput> {
        debug!(addr = %target.addr(), "running remote command");
        self.run(target, command, None).await
    }
}

/// Client handler for target connections.
///
/// Targets are reached by IP with a shared admin key and carry no pinned host
/// key, so every server key is accepted and its fingerprint logged.
struct TargetHandler {
    addr: String,
}

impl client::Handler for TargetHandler {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = std::result::Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(russh::keys::ssh_key::HashAlg::Sha256);
        debug!(addr = %self.addr, %fingerprint, "accepting target host key");
        async { Ok(true) }
    }
}
