// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The account's end-to-end key and the values that let it be re-derived.

use crate::crypto::SymmetricKey;
use crate::storage::{keys, CredentialStore, CredentialStoreExt, StorageError};

/// Fixed length of the key salt in bytes.
pub const SALT_LEN: usize = 16;

/// Encryption key plus the salt and check blob it was derived and sealed with.
///
/// `key` is always re-derivable from the password and `salt`. `salt` and
/// `password_check` may be mirrored to the server; `salt_saved` records
/// whether that mirroring succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyRecord {
    pub key: SymmetricKey,
    pub salt: [u8; SALT_LEN],
    pub password_check: Vec<u8>,
    pub salt_saved: bool,
}

impl PrivateKeyRecord {
    /// Loads the record for `account`, or `None` if no key has been set up.
    pub fn load(
        store: &dyn CredentialStore,
        account: &str,
    ) -> Result<Option<Self>, StorageError> {
        let key = match store.get_bytes(account, keys::ENC_KEY)? {
            Some(bytes) => SymmetricKey::from_slice(&bytes).map_err(|e| StorageError::CorruptValue {
                key: keys::ENC_KEY.to_string(),
                reason: e.to_string(),
            })?,
            None => return Ok(None),
        };

        let salt_bytes = store
            .get_bytes(account, keys::ENC_SALT)?
            .ok_or_else(|| StorageError::NotFound(keys::ENC_SALT.to_string()))?;
        let salt = parse_salt(&salt_bytes).ok_or_else(|| StorageError::CorruptValue {
            key: keys::ENC_SALT.to_string(),
            reason: format!("expected {} bytes, got {}", SALT_LEN, salt_bytes.len()),
        })?;

        let password_check = store
            .get_bytes(account, keys::ENC_PWD_CHECK)?
            .ok_or_else(|| StorageError::NotFound(keys::ENC_PWD_CHECK.to_string()))?;

        Ok(Some(PrivateKeyRecord {
            key,
            salt,
            password_check,
            salt_saved: store.get_flag(account, keys::ENC_SALT_SAVED)?,
        }))
    }

    /// Persists every field of the record for `account`.
    pub fn save(&self, store: &dyn CredentialStore, account: &str) -> Result<(), StorageError> {
        store.set_bytes(account, keys::ENC_SALT, Some(&self.salt[..]))?;
        store.set_bytes(account, keys::ENC_PWD_CHECK, Some(self.password_check.as_slice()))?;
        store.set_flag(account, keys::ENC_SALT_SAVED, self.salt_saved)?;
        store.set_bytes(account, keys::ENC_KEY, Some(&self.key.as_bytes()[..]))
    }

    /// Records that salt and check blob reached the server.
    pub fn mark_salt_saved(
        &mut self,
        store: &dyn CredentialStore,
        account: &str,
    ) -> Result<(), StorageError> {
        self.salt_saved = true;
        store.set_flag(account, keys::ENC_SALT_SAVED, true)
    }

    /// Removes the record for `account`.
    pub fn clear(store: &dyn CredentialStore, account: &str) -> Result<(), StorageError> {
        for key in [
            keys::ENC_KEY,
            keys::ENC_SALT,
            keys::ENC_PWD_CHECK,
            keys::ENC_SALT_SAVED,
        ] {
            store.set(account, key, None)?;
        }
        Ok(())
    }
}

/// Accepts a salt only at the fixed length.
pub fn parse_salt(bytes: &[u8]) -> Option<[u8; SALT_LEN]> {
    bytes.try_into().ok()
}
