// ABOUTME: CLI command definitions using clap
// ABOUTME: Defines the creds command plus role, key, and lease management subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod creds;
pub mod key;
pub mod lease;
pub mod role;

#[derive(Parser)]
#[command(name = "tollgate", about = "Issue short-lived SSH credentials")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: ~/.config/tollgate/config.toml)
    #[arg(long, global = true, env = "TOLLGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging for tollgate crates
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Issue a credential for creds/<role>
    Creds {
        /// Role name
        role: String,

        /// Target IP address
        #[arg(long)]
        ip: String,

        /// Username on the target (default: the role's default user)
        #[arg(long)]
        username: Option<String>,

        /// Include revocation metadata in the output
        #[arg(long)]
        show_internal: bool,
    },

    /// Manage roles
    #[command(subcommand)]
    Role(RoleCommand),

    /// Manage shared host keys
    #[command(subcommand)]
    Key(KeyCommand),

    /// Manage the lease policy
    #[command(subcommand)]
    Lease(LeaseCommand),
}

#[derive(Subcommand)]
pub enum RoleCommand {
    /// Create or replace a role from a JSON file
    Write {
        /// Role name
        name: String,

        /// JSON role record
        file: PathBuf,
    },

    /// List role names
    List,
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Store an administrative private key
    Write {
        /// Key name, referenced by a role's "key" field
        name: String,

        /// Private key file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum LeaseCommand {
    /// Set the lease applied to every issued credential
    Write {
        /// Lease duration in seconds
        #[arg(long)]
        lease: u64,

        /// Maximum lease in seconds, reported as the grace period
        #[arg(long)]
        lease_max: u64,
    },
}
