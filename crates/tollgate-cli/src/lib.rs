// ABOUTME: Library side of the tollgate CLI
// ABOUTME: Opens config, storage, and salt, then dispatches to the command handlers

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tollgate_core::{Config, Salt, SqliteStorage};
use tracing::debug;

pub mod commands;

pub use commands::{Command, KeyCommand, LeaseCommand, RoleCommand};

/// What every command needs: loaded config and opened storage.
pub struct Context {
    pub config: Config,
    pub storage: Arc<SqliteStorage>,
}

impl Context {
    /// Load config (explicit path, else XDG default) and open the database.
    pub async fn open(config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        let db_path = config.db_path();
        let storage = SqliteStorage::open(&db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        debug!(path = %db_path.display(), "opened storage");

        Ok(Self {
            config,
            storage: Arc::new(storage),
        })
    }

    /// Configured salt, or the one persisted in storage.
    pub async fn salt(&self) -> Result<Salt> {
        match &self.config.otp.salt {
            Some(material) => Ok(Salt::new(material.as_str())),
            None => Salt::load_or_create(self.storage.as_ref())
                .await
                .context("Failed to load salt from storage"),
        }
    }
}

/// Run a command against the configured storage
pub async fn run_command(command: Command, config_path: Option<PathBuf>) -> Result<()> {
    let ctx = Context::open(config_path).await?;

    match command {
        Command::Creds {
            role,
            ip,
            username,
            show_internal,
        } => commands::creds::run(&ctx, role, ip, username, show_internal).await,
        Command::Role(cmd) => commands::role::run(&ctx, cmd).await,
        Command::Key(cmd) => commands::key::run(&ctx, cmd).await,
        Command::Lease(cmd) => commands::lease::run(&ctx, cmd).await,
    }
}
