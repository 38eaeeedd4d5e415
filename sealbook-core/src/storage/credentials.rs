// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Account-scoped key-value store.
//!
//! Salts, check blobs, cached session tokens, restrictions and sync anchors
//! are persisted as opaque string values against the account. The core never
//! assumes a backend: the store is injected.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::StorageError;

/// Well-known keys written by the core.
pub mod keys {
    /// Cached session token from the last successful authentication.
    pub const SESSION_TOKEN: &str = "session_token";
    /// Password-derived SRP value, re-used for silent re-authentication.
    pub const STORED_SECRET: &str = "stored_secret";
    /// Server-issued salt the stored secret was derived with.
    pub const PWD_SALT: &str = "pwd_salt";
    /// End-to-end encryption key bytes.
    pub const ENC_KEY: &str = "enc_key";
    /// Salt the encryption key was derived with.
    pub const ENC_SALT: &str = "enc_salt";
    /// Password-check blob for the encryption key.
    pub const ENC_PWD_CHECK: &str = "enc_pwd_check";
    /// Whether salt and check blob were mirrored to the server.
    pub const ENC_SALT_SAVED: &str = "enc_salt_saved";
    /// JSON-encoded restrictions.
    pub const RESTRICTIONS: &str = "restrictions";
    /// Unix seconds of the last restrictions fetch.
    pub const RESTRICTIONS_FETCHED_AT: &str = "restrictions_fetched_at";
    /// Opaque server cursor.
    pub const SYNC_ANCHOR: &str = "sync_anchor";
    /// Server-assigned client id.
    pub const CLIENT_ID: &str = "client_id";
}

/// Injected get/set store keyed by account and key.
pub trait CredentialStore {
    /// Returns the value for `key`, or `None` if unset.
    fn get(&self, account: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Sets `key` to `value`; `None` removes it.
    fn set(&self, account: &str, key: &str, value: Option<&str>) -> Result<(), StorageError>;
}

/// Typed accessors layered over any [`CredentialStore`].
pub trait CredentialStoreExt: CredentialStore {
    /// Reads a base64-encoded binary value.
    fn get_bytes(&self, account: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.get(account, key)? {
            Some(value) => BASE64
                .decode(value.as_bytes())
                .map(Some)
                .map_err(|e| StorageError::CorruptValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Writes a binary value as base64.
    fn set_bytes(&self, account: &str, key: &str, value: Option<&[u8]>) -> Result<(), StorageError> {
        let encoded = value.map(|v| BASE64.encode(v));
        self.set(account, key, encoded.as_deref())
    }

    /// Reads a boolean stored as `"true"`/`"false"`. Missing means false.
    fn get_flag(&self, account: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(account, key)?.as_deref() == Some("true"))
    }

    fn set_flag(&self, account: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.set(account, key, Some(if value { "true" } else { "false" }))
    }

    /// Reads an unsigned integer.
    fn get_u64(&self, account: &str, key: &str) -> Result<Option<u64>, StorageError> {
        match self.get(account, key)? {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e: std::num::ParseIntError| StorageError::CorruptValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_u64(&self, account: &str, key: &str, value: u64) -> Result<(), StorageError> {
        self.set(account, key, Some(&value.to_string()))
    }
}

impl<T: CredentialStore + ?Sized> CredentialStoreExt for T {}

/// In-process store, for tests and for callers that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values held for `account`.
    pub fn len_for(&self, account: &str) -> usize {
        self.values
            .lock()
            .map(|values| values.keys().filter(|(a, _)| a == account).count())
            .unwrap_or(0)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, account: &str, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(values
            .get(&(account.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, account: &str, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::LockPoisoned)?;
        let map_key = (account.to_string(), key.to_string());
        match value {
            Some(v) => {
                values.insert(map_key, v.to_string());
            }
            None => {
                values.remove(&map_key);
            }
        }
        Ok(())
    }
}
