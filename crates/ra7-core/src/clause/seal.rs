//! On-disk clause seal: deploy once, verify the stored SHA-256 forever after.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::lock::ClauseLock;
use crate::types::Address;

pub const CLAUSE_TEXT: &str = "No upgrade path in EternalLock.sol contract. DAO cannot override.";

const SEAL_NOTE: &str =
    "This file represents an immutable contract. Its hash must always match its content.";

#[derive(Error, Debug)]
pub enum SealError {
    #[error("'{0}' already exists. Deployment aborted to preserve immutability.")]
    AlreadyDeployed(PathBuf),

    #[error("contract file '{0}' not found")]
    Missing(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON written to the seal file. Fields are optional on read so a damaged
/// file is reported as corrupted instead of failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealDocument {
    #[serde(default)]
    pub clause_content: Option<String>,
    #[serde(default)]
    pub deployment_hash: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    /// SHA-256 over the clause and the three lock fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Intact { hash: String },
    Tampered { stored: String, calculated: String },
    /// Content or hash missing or empty
    Corrupted,
    /// The file is not valid seal JSON
    Unreadable(String),
}

impl Verification {
    pub fn is_intact(&self) -> bool {
        matches!(self, Verification::Intact { .. })
    }
}

pub fn calculate_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hash binding the clause to its reference, deployer and deployment time.
pub fn calculate_lock_hash(
    clause: &str,
    reference: Address,
    deployer: Address,
    deployed_at: DateTime<Utc>,
) -> String {
    calculate_hash(&format!(
        "{}\n{}\n{}\n{}.{:09}",
        clause,
        reference,
        deployer,
        deployed_at.timestamp(),
        deployed_at.timestamp_subsec_nanos()
    ))
}

/// Write the seal for `lock`. Refuses to touch an existing file.
pub fn deploy(path: &Path, lock: &ClauseLock) -> Result<SealDocument, SealError> {
    let content_hash = calculate_hash(lock.clause());
    let doc = SealDocument {
        clause_content: Some(lock.clause().to_string()),
        deployment_hash: Some(content_hash.clone()),
        note: Some(SEAL_NOTE.to_string()),
        reference_address: Some(lock.reference()),
        deployer: Some(lock.deployer()),
        deployed_at: Some(lock.deployed_at()),
        lock_hash: Some(calculate_lock_hash(
            lock.clause(),
            lock.reference(),
            lock.deployer(),
            lock.deployed_at(),
        )),
    };

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            warn!("Seal {} already present, not redeploying", path.display());
            return Err(SealError::AlreadyDeployed(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let body = serde_json::to_string_pretty(&doc)?;
    file.write_all(body.as_bytes())?;

    info!("Eternal Clause deployed to {} (hash {})", path.display(), content_hash);
    Ok(doc)
}

/// Recompute the clause hash and compare with the stored one. Seals that
/// carry lock fields must also match their lock hash; legacy seals without
/// any lock field are checked on content alone.
pub fn verify(path: &Path) -> Result<Verification, SealError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SealError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let doc: SealDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => return Ok(Verification::Unreadable(e.to_string())),
    };

    let (content, stored) = match (doc.clause_content, doc.deployment_hash) {
        (Some(c), Some(h)) if !c.is_empty() && !h.is_empty() => (c, h),
        _ => return Ok(Verification::Corrupted),
    };

    let calculated = calculate_hash(&content);
    if calculated != stored {
        warn!("Seal {} does not match its content", path.display());
        return Ok(Verification::Tampered { stored, calculated });
    }

    match (doc.reference_address, doc.deployer, doc.deployed_at, doc.lock_hash) {
        (None, None, None, None) => Ok(Verification::Intact { hash: stored }),
        (Some(reference), Some(deployer), Some(deployed_at), Some(stored_lock)) => {
            let calculated_lock = calculate_lock_hash(&content, reference, deployer, deployed_at);
            if calculated_lock == stored_lock {
                Ok(Verification::Intact { hash: stored })
            } else {
                warn!("Seal {} lock fields do not match their hash", path.display());
                Ok(Verification::Tampered {
                    stored: stored_lock,
                    calculated: calculated_lock,
                })
            }
        }
        _ => Ok(Verification::Corrupted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::DeployContext;

    fn lock() -> ClauseLock {
        ClauseLock::deploy(CLAUSE_TEXT, Address::ZERO, DeployContext::now(Address::ZERO)).0
    }

    #[test]
    fn test_calculate_hash_known_value() {
        assert_eq!(
            calculate_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_deploy_then_verify_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EternalLock.sol_lock");

        let doc = deploy(&path, &lock()).unwrap();
        assert_eq!(doc.clause_content.as_deref(), Some(CLAUSE_TEXT));

        let result = verify(&path).unwrap();
        assert_eq!(
            result,
            Verification::Intact {
                hash: calculate_hash(CLAUSE_TEXT)
            }
        );
    }

    #[test]
    fn test_second_deploy_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        deploy(&path, &lock()).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = deploy(&path, &lock()).unwrap_err();
        assert!(matches!(err, SealError::AlreadyDeployed(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_tampered_content_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        deploy(&path, &lock()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("cannot", "can")).unwrap();

        match verify(&path).unwrap() {
            Verification::Tampered { stored, calculated } => assert_ne!(stored, calculated),
            other => panic!("expected tampered, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        std::fs::write(&path, r#"{"clause_content": "x"}"#).unwrap();
        assert_eq!(verify(&path).unwrap(), Verification::Corrupted);

        std::fs::write(&path, r#"{"clause_content": "", "deployment_hash": "abc"}"#).unwrap();
        assert_eq!(verify(&path).unwrap(), Verification::Corrupted);
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(verify(&path).unwrap(), Verification::Unreadable(_)));
    }

    #[test]
    fn test_verify_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, SealError::Missing(_)));
    }

    #[test]
    fn test_rewritten_reference_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        let reference = Address::from_bytes([0x07; 20]);
        let (lock, _) = ClauseLock::deploy(
            CLAUSE_TEXT,
            reference,
            DeployContext::now(Address::from_bytes([0x01; 20])),
        );
        deploy(&path, &lock).unwrap();
        assert!(verify(&path).unwrap().is_intact());

        let raw = std::fs::read_to_string(&path).unwrap();
        let forged = raw.replace(&"07".repeat(20), &"09".repeat(20));
        assert_ne!(raw, forged);
        std::fs::write(&path, forged).unwrap();

        assert!(matches!(
            verify(&path).unwrap(),
            Verification::Tampered { .. }
        ));
    }

    #[test]
    fn test_stripped_lock_hash_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        deploy(&path, &lock()).unwrap();

        let mut doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        doc.as_object_mut().unwrap().remove("lock_hash");
        std::fs::write(&path, doc.to_string()).unwrap();

        assert_eq!(verify(&path).unwrap(), Verification::Corrupted);
    }

    #[test]
    fn test_legacy_seal_without_lock_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal");
        let legacy = serde_json::json!({
            "clause_content": CLAUSE_TEXT,
            "deployment_hash": calculate_hash(CLAUSE_TEXT),
            "note": SEAL_NOTE,
        });
        std::fs::write(&path, legacy.to_string()).unwrap();
        assert!(verify(&path).unwrap().is_intact());
    }
}
