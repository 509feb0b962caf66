//! AES-256-GCM sealing and PBKDF2 password hashing (ring).

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use std::path::Path;
use tracing::info;

use super::VaultError;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

fn random_bytes<const N: usize>() -> Result<[u8; N], VaultError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| VaultError::Crypto("system RNG unavailable".into()))?;
    Ok(buf)
}

/// Symmetric key protecting the vault storage file.
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn generate() -> Result<Self, VaultError> {
        Ok(Self(random_bytes::<KEY_LEN>()?))
    }

    /// Read the raw key file, creating it with a fresh key if absent.
    pub fn load_or_create(path: &Path) -> Result<Self, VaultError> {
        if path.is_file() {
            let bytes = std::fs::read(path)?;
            let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
                VaultError::Crypto(format!(
                    "key file {} holds {} bytes, expected {}",
                    path.display(),
                    b.len(),
                    KEY_LEN
                ))
            })?;
            return Ok(Self(key));
        }
        let key = Self::generate()?;
        std::fs::write(path, key.0)?;
        info!("Generated new vault key at {}", path.display());
        Ok(key)
    }

    fn aead_key(&self) -> Result<LessSafeKey, VaultError> {
        UnboundKey::new(&AES_256_GCM, &self.0)
            .map(LessSafeKey::new)
            .map_err(|_| VaultError::Crypto("invalid AES-256 key".into()))
    }

    /// Returns `nonce || ciphertext || tag`.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        let key = self.aead_key()?;
        let nonce_bytes = random_bytes::<NONCE_LEN>()?;
        let mut in_out = data.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| VaultError::Crypto("encryption failed".into()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + in_out.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);
        Ok(payload)
    }

    pub fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, VaultError> {
        if payload.len() < NONCE_LEN {
            return Err(VaultError::Crypto("ciphertext too short".into()));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| VaultError::Crypto("bad nonce".into()))?;

        let key = self.aead_key()?;
        let mut in_out = ciphertext.to_vec();
        let plain = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Crypto("decryption failed (wrong key or tampered data)".into()))?;
        Ok(plain.to_vec())
    }
}

fn rounds(iterations: u32) -> Result<NonZeroU32, VaultError> {
    NonZeroU32::new(iterations).ok_or_else(|| VaultError::Crypto("iterations must be > 0".into()))
}

/// Derive a password hash. A fresh salt is drawn when `salt` is None.
pub fn hash_password(
    password: &str,
    salt: Option<[u8; SALT_LEN]>,
    iterations: u32,
) -> Result<([u8; SALT_LEN], [u8; HASH_LEN]), VaultError> {
    let salt = match salt {
        Some(s) => s,
        None => random_bytes::<SALT_LEN>()?,
    };
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        rounds(iterations)?,
        &salt,
        password.as_bytes(),
        &mut hash,
    );
    Ok((salt, hash))
}

/// Constant-time check of `password` against a stored hash.
pub fn verify_password(
    password: &str,
    salt: &[u8],
    expected: &[u8],
    iterations: u32,
) -> Result<bool, VaultError> {
    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        rounds(iterations)?,
        salt,
        password.as_bytes(),
        expected,
    )
    .is_ok())
}
