// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Management
//!
//! Derives the account's end-to-end encryption key from the user's password
//! and a per-account salt, and produces or validates the offline
//! password-check blob that proves a candidate key is the right one.

pub mod password;
pub mod password_check;
mod record;

pub use password::{check_password_strength, PasswordStrength};
pub use password_check::{upc_checksum, validate_check_code};
pub use record::{parse_salt, PrivateKeyRecord, SALT_LEN};

use thiserror::Error;
use tracing::{debug, info};

use crate::crypto::{derive_key_argon2id, fill_random, KdfParams, SymmetricKey};
use crate::storage::StorageError;

/// Key management error types.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The candidate password or key does not match the check blob.
    #[error("Invalid key: the password does not match this account")]
    InvalidKey,

    #[error("Password too weak: {feedback}")]
    WeakPassword { feedback: String },

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Derives and validates the end-to-end encryption key.
///
/// Holds no key material itself; every operation is a pure function of its
/// inputs and the configured KDF cost.
#[derive(Debug, Clone, Default)]
pub struct KeyManager {
    kdf: KdfParams,
}

impl KeyManager {
    pub fn new(kdf: KdfParams) -> Self {
        KeyManager { kdf }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Derives the encryption key. Identical inputs always yield identical bytes.
    pub fn derive_key(&self, password: &str, salt: &[u8]) -> Result<SymmetricKey, KeyError> {
        derive_key_argon2id(password.as_bytes(), salt, &self.kdf)
            .map_err(|e| KeyError::Derivation(e.to_string()))
    }

    pub fn create_password_check(&self, key: &SymmetricKey) -> Result<Vec<u8>, KeyError> {
        password_check::create_password_check(key)
    }

    pub fn validate_password_check(
        &self,
        check_blob: &[u8],
        candidate: &SymmetricKey,
    ) -> Result<(), KeyError> {
        password_check::validate_password_check(check_blob, candidate)
    }

    /// Creates the account key, or re-creates it from an existing salt.
    ///
    /// Without `existing_check` this is first-time creation: the password must
    /// pass the strength gate, and a fresh check blob is produced for
    /// publishing. With it, the re-derived key must validate against the blob
    /// or [`KeyError::InvalidKey`] is returned and nothing may be persisted.
    pub fn create_or_recreate_key(
        &self,
        password: &str,
        salt: [u8; SALT_LEN],
        existing_check: Option<&[u8]>,
    ) -> Result<PrivateKeyRecord, KeyError> {
        match existing_check.filter(|blob| !blob.is_empty()) {
            None => {
                check_password_strength(password)?;
                let key = self.derive_key(password, &salt)?;
                let password_check = self.create_password_check(&key)?;
                info!("Created new encryption key");
                Ok(PrivateKeyRecord {
                    key,
                    salt,
                    password_check,
                    salt_saved: false,
                })
            }
            Some(blob) => {
                let key = self.derive_key(password, &salt)?;
                self.validate_password_check(blob, &key)?;
                debug!("Re-created encryption key from existing salt");
                Ok(PrivateKeyRecord {
                    key,
                    salt,
                    password_check: blob.to_vec(),
                    salt_saved: true,
                })
            }
        }
    }

    /// Generates a random salt for a new key.
    pub fn generate_salt() -> Result<[u8; SALT_LEN], KeyError> {
        let mut salt = [0u8; SALT_LEN];
        fill_random(&mut salt).map_err(|e| KeyError::Derivation(e.to_string()))?;
        Ok(salt)
    }
}
