// ABOUTME: Core library for tollgate - storage, roles, OTP and dynamic key issuance
// ABOUTME: CredsBackend is the entry point that turns a creds/<role> request into a leased secret

pub mod admin;
pub mod config;
pub mod creds;
pub mod dynamic;
pub mod error;
pub mod lease;
pub mod otp;
pub mod role;
pub mod salt;
pub mod storage;

pub use config::Config;
pub use creds::{
    CredentialData, CredsBackend, CredsPath, CredsRequest, CredsResponse, InternalData, IssuerSettings,
    SecretType,
};
pub use error::{CredsError, Result};
pub use lease::{Lease, LeaseConfig};
pub use role::{KeyType, Role, RoleEntry};
pub use salt::Salt;
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageEntry, StorageError};
