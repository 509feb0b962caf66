//! Encrypted notes vault with login and license gating.
//!
//! All users live in one JSON document sealed with the master key. Password
//! hashes are PBKDF2 with a per-user salt; the iteration count is stored per
//! record so it can be raised without invalidating old accounts.

pub mod crypto;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::{self, Analytics};
use crate::config::Config;
use crypto::MasterKey;

pub const VALID_LICENSE: &str = "RA7-PREMIUM-2024";
pub const LICENSE_PRICE: f64 = 9.99;

/// Characters a free account may keep in its notes.
pub const FREE_NOTE_LIMIT: usize = 100;

const LEGACY_ITERATIONS: u32 = 390_000;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("User exists: {0}")]
    UserExists(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

fn legacy_iterations() -> u32 {
    LEGACY_ITERATIONS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    salt: String,
    pw_hash: String,
    #[serde(default)]
    license: String,
    #[serde(default)]
    notes: String,
    #[serde(default = "legacy_iterations")]
    iterations: u32,
}

impl UserRecord {
    fn premium(&self) -> bool {
        self.license == VALID_LICENSE
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Storage {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub referral_code: String,
    pub premium: bool,
}

/// Proof of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    premium: bool,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn premium(&self) -> bool {
        self.premium
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved_chars: usize,
    pub truncated: bool,
}

pub struct Vault {
    storage_path: PathBuf,
    key: MasterKey,
    analytics: Analytics,
    iterations: u32,
}

impl Vault {
    pub fn open(config: &Config) -> Result<Self, VaultError> {
        let key = MasterKey::load_or_create(&config.resolve_path(&config.key_file))?;
        Ok(Self {
            storage_path: config.resolve_path(&config.storage_file),
            key,
            analytics: Analytics::new(&config.resolve_path(&config.analytics_file)),
            iterations: config.kdf_iterations,
        })
    }

    /// Analytics are best-effort; a failed write never blocks the vault.
    fn track(&self, event: &str) {
        if let Err(e) = self.analytics.log_event(event) {
            warn!("Failed to record analytics event {}: {:#}", event, e);
        }
    }

    pub fn launch(&self) {
        self.track("launch");
    }

    fn load(&self) -> Result<Storage, VaultError> {
        if !self.storage_path.is_file() {
            return Ok(Storage::default());
        }
        let sealed = std::fs::read(&self.storage_path)?;
        let plain = self.key.decrypt(&sealed)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    fn store(&self, storage: &Storage) -> Result<(), VaultError> {
        let plain = serde_json::to_vec(storage)?;
        std::fs::write(&self.storage_path, self.key.encrypt(&plain)?)?;
        debug!("vault storage written ({} users)", storage.users.len());
        Ok(())
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        license: &str,
    ) -> Result<Registration, VaultError> {
        let mut storage = self.load()?;
        if storage.users.contains_key(username) {
            return Err(VaultError::UserExists(username.to_string()));
        }

        let (salt, hash) = crypto::hash_password(password, None, self.iterations)?;
        let record = UserRecord {
            salt: B64.encode(salt),
            pw_hash: B64.encode(hash),
            license: license.to_string(),
            notes: String::new(),
            iterations: self.iterations,
        };
        let premium = record.premium();
        storage.users.insert(username.to_string(), record);
        self.store(&storage)?;
        info!("Registered user {} (premium: {})", username, premium);

        self.track("register");
        if premium {
            if let Err(e) = self.analytics.log_revenue(LICENSE_PRICE) {
                warn!("Failed to record revenue: {:#}", e);
            }
        }
        Ok(Registration {
            referral_code: analytics::generate_referral_code(),
            premium,
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, VaultError> {
        let storage = self.load()?;
        let record = storage
            .users
            .get(username)
            .ok_or_else(|| VaultError::UserNotFound(username.to_string()))?;

        let salt = B64.decode(&record.salt)?;
        let expected = B64.decode(&record.pw_hash)?;
        if !crypto::verify_password(password, &salt, &expected, record.iterations)? {
            return Err(VaultError::IncorrectPassword);
        }

        self.track("login");
        Ok(Session {
            username: username.to_string(),
            premium: record.premium(),
        })
    }

    pub fn load_notes(&self, session: &Session) -> Result<String, VaultError> {
        let storage = self.load()?;
        storage
            .users
            .get(&session.username)
            .map(|r| r.notes.clone())
            .ok_or_else(|| VaultError::UserNotFound(session.username.clone()))
    }

    /// Free accounts keep only the first [`FREE_NOTE_LIMIT`] characters.
    pub fn save_notes(&self, session: &Session, notes: &str) -> Result<SaveOutcome, VaultError> {
        let mut storage = self.load()?;
        let record = storage
            .users
            .get_mut(&session.username)
            .ok_or_else(|| VaultError::UserNotFound(session.username.clone()))?;

        let truncated = !session.premium && notes.chars().count() > FREE_NOTE_LIMIT;
        record.notes = if truncated {
            notes.chars().take(FREE_NOTE_LIMIT).collect()
        } else {
            notes.to_string()
        };
        let saved_chars = record.notes.chars().count();
        self.store(&storage)?;

        if truncated {
            info!(
                "Notes for {} truncated to {} characters (free account)",
                session.username, FREE_NOTE_LIMIT
            );
        }
        self.track("save");
        Ok(SaveOutcome {
            saved_chars,
            truncated,
        })
    }
}
