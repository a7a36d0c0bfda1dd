// ABOUTME: One-time password generation and recording
// ABOUTME: Salted random identifiers, plus the issuer that binds an OTP to a (username, ip) pair

use crate::error::{CredsError, Result};
use crate::salt::Salt;
use crate::storage::{Storage, StorageEntry};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage prefix for OTP entries.
pub const OTP_PREFIX: &str = "otp/";

/// Attempts before giving up on finding a free OTP slot.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Source of raw random tokens.
pub type TokenSource = Arc<dyn Fn() -> String + Send + Sync>;

/// A raw token and its salted storage identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SaltedToken {
    pub raw: String,
    pub salted: String,
}

impl std::fmt::Debug for SaltedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltedToken")
            .field("salted", &self.salted)
            .finish_non_exhaustive()
    }
}

/// Generates random tokens together with their salted identifiers.
///
/// Shared by the OTP issuer (storage keys) and the key installer (temporary
/// file names on targets).
#[derive(Clone)]
pub struct TokenGenerator {
    salt: Salt,
    source: TokenSource,
}

impl TokenGenerator {
    /// Generator backed by random UUID v4 tokens.
    pub fn new(salt: Salt) -> Self {
        Self::with_source(salt, Arc::new(|| uuid::Uuid::new_v4().to_string()))
    }

    pub fn with_source(salt: Salt, source: TokenSource) -> Self {
        Self { salt, source }
    }

    pub fn generate(&self) -> SaltedToken {
        let raw = (self.source)();
        let salted = self.salt.salt_id(&raw);
        SaltedToken { raw, salted }
    }
}

/// Value stored under `otp/<salted>` for the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpEntry {
    pub username: String,
    pub ip: String,
}

/// Issues OTPs that do not collide with any live entry.
#[derive(Clone)]
pub struct OtpIssuer {
    tokens: TokenGenerator,
    max_attempts: u32,
}

impl OtpIssuer {
    pub fn new(tokens: TokenGenerator, max_attempts: u32) -> Self {
        Self {
            tokens,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Record a fresh OTP for `username`@`ip` and return the raw value.
    ///
    /// Only the salted identifier reaches storage. Each candidate is written
    /// with `create_if_absent`; a collision draws a new token, up to
    /// `max_attempts` times. Storage errors abort immediately.
    pub async fn issue(&self, storage: &dyn Storage, username: &str, ip: IpAddr) -> Result<String> {
        let record = OtpEntry {
            username: username.to_string(),
            ip: ip.to_string(),
        };

        for attempt in 1..=self.max_attempts {
            let token = self.tokens.generate();
            let entry = StorageEntry::json(format!("{OTP_PREFIX}{}", token.salted), &record)?;
            if storage.create_if_absent(entry).await? {
                debug!(attempt, "recorded OTP entry");
                return Ok(token.raw);
            }
            warn!(attempt, "OTP collided with an existing entry, regenerating");
        }

        Err(CredsError::OtpExhausted(self.max_attempts))
    }
}
